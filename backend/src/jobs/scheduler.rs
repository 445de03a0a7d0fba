// Job Scheduler - Cron wiring for the due-date notifier

use std::sync::Arc;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler as TokioScheduler, JobSchedulerError};
use tracing::{error, info};

use super::DueNotifierJob;
use crate::AppState;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(#[from] JobSchedulerError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type JobResult<T> = Result<T, JobError>;

pub struct JobScheduler {
    scheduler: TokioScheduler,
    state: Arc<AppState>,
}

impl JobScheduler {
    pub async fn new(state: Arc<AppState>) -> JobResult<Self> {
        let scheduler = TokioScheduler::new().await?;
        Ok(Self { scheduler, state })
    }

    pub async fn start(&self) -> JobResult<()> {
        info!("Starting background job scheduler");

        self.schedule_due_notifier().await?;
        self.scheduler.start().await?;

        info!("Background job scheduler started successfully");
        Ok(())
    }

    async fn schedule_due_notifier(&self) -> JobResult<()> {
        let cron_expr = self.state.config.notify_schedule.clone();
        if cron_expr.split_whitespace().count() != 6 {
            return Err(JobError::ConfigError(format!(
                "NOTIFY_SCHEDULE must be a 6-field cron expression, got '{}'",
                cron_expr
            )));
        }

        let state = self.state.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let state = state.clone();

            Box::pin(async move {
                info!("Running due-date notifier job");

                match DueNotifierJob::from_state(&state).run().await {
                    Ok(report) => {
                        info!(
                            "Due-date notifier done: {} due, {} sms sent, {} sms failed, {} emails sent, {} emails failed",
                            report.customers_due,
                            report.sms_sent,
                            report.sms_failed,
                            report.emails_sent,
                            report.emails_failed
                        );
                    }
                    Err(e) => {
                        error!("Due-date notifier failed: {}", e);
                    }
                }
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled due-date notifier with cron '{}'", cron_expr);

        Ok(())
    }
}
