// Background Jobs
//
// Scheduled work for the dashboard. The due-date notifier runs once a day via
// tokio-cron-scheduler and can also be triggered on demand from the API.

pub mod due_notifier;
pub mod scheduler;

pub use due_notifier::{BatchReport, DueNotifierJob, NotifyError};
pub use scheduler::{JobError, JobResult, JobScheduler};
