// Due-Date Notifier Job - Notifies customers whose service due date is today
//
// One run is one pass over the due set. Attempts are isolated per
// (customer, channel) pair: a failed SMS never blocks the email attempt for
// the same customer, and no customer's failures stop the rest of the batch.
// Every attempt, success or failure, produces exactly one delivery log row.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use duetrack_shared::{Channel, Customer, DeliveryStatus, NotificationLog, NotificationTemplate};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::notifications::store::{PgCustomerStore, PgDeliveryLog, PgTemplateStore};
use crate::notifications::template::{format_end_of_month, render_notification, TemplateVars};
use crate::notifications::{
    CustomerStore, DeliveryLog, MailGateway, SmsGateway, TemplateStore,
};
use crate::AppState;

/// Upper bound on customers processed concurrently. Within one customer the
/// SMS and email attempts also run concurrently.
const MAX_IN_FLIGHT: usize = 8;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// A missing shared template is a configuration error, not a delivery
    /// error: the batch aborts before any send.
    #[error("notification template is not configured")]
    TemplateMissing,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::TemplateMissing => AppError::Conflict(err.to_string()),
            NotifyError::Database(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

/// Summary of one batch run, returned by the trigger endpoint and logged by
/// the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_date: NaiveDate,
    pub customers_due: usize,
    pub sms_sent: usize,
    pub sms_failed: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub skipped_no_contact: usize,
}

struct CustomerOutcome {
    sms: Option<DeliveryStatus>,
    email: Option<DeliveryStatus>,
    skipped: bool,
}

pub struct DueNotifierJob {
    customers: Arc<dyn CustomerStore>,
    templates: Arc<dyn TemplateStore>,
    delivery_log: Arc<dyn DeliveryLog>,
    sms: Arc<dyn SmsGateway>,
    mail: Arc<dyn MailGateway>,
    product_url: String,
}

impl DueNotifierJob {
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        templates: Arc<dyn TemplateStore>,
        delivery_log: Arc<dyn DeliveryLog>,
        sms: Arc<dyn SmsGateway>,
        mail: Arc<dyn MailGateway>,
        product_url: String,
    ) -> Self {
        Self {
            customers,
            templates,
            delivery_log,
            sms,
            mail,
            product_url,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::new(PgCustomerStore::new(state.db_pool.clone())),
            Arc::new(PgTemplateStore::new(state.db_pool.clone())),
            Arc::new(PgDeliveryLog::new(state.db_pool.clone())),
            state.sms.clone(),
            state.mail.clone(),
            state.config.product_url.clone(),
        )
    }

    /// Run the batch for today, UTC day truncation on both sides of the
    /// due-date comparison.
    pub async fn run(&self) -> Result<BatchReport, NotifyError> {
        self.run_for_date(Utc::now().date_naive()).await
    }

    pub async fn run_for_date(&self, run_date: NaiveDate) -> Result<BatchReport, NotifyError> {
        // The template is shared by every send, fetched once up front.
        let template = self
            .templates
            .find_singleton()
            .await?
            .ok_or(NotifyError::TemplateMissing)?;

        let due = self.customers.due_on(run_date).await?;
        info!("Due-date notifier: {} customers due on {}", due.len(), run_date);

        let customers_due = due.len();
        let outcomes: Vec<CustomerOutcome> = stream::iter(due)
            .map(|customer| self.notify_customer(&template, customer, run_date))
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;

        let mut report = BatchReport {
            run_date,
            customers_due,
            sms_sent: 0,
            sms_failed: 0,
            emails_sent: 0,
            emails_failed: 0,
            skipped_no_contact: 0,
        };

        for outcome in outcomes {
            if outcome.skipped {
                report.skipped_no_contact += 1;
            }
            match outcome.sms {
                Some(DeliveryStatus::Sent) => report.sms_sent += 1,
                Some(DeliveryStatus::Failed) => report.sms_failed += 1,
                None => {}
            }
            match outcome.email {
                Some(DeliveryStatus::Sent) => report.emails_sent += 1,
                Some(DeliveryStatus::Failed) => report.emails_failed += 1,
                None => {}
            }
        }

        info!(
            "Due-date notifier completed: {} due, sms {}/{} sent, email {}/{} sent, {} skipped",
            report.customers_due,
            report.sms_sent,
            report.sms_sent + report.sms_failed,
            report.emails_sent,
            report.emails_sent + report.emails_failed,
            report.skipped_no_contact
        );

        Ok(report)
    }

    async fn notify_customer(
        &self,
        template: &NotificationTemplate,
        customer: Customer,
        run_date: NaiveDate,
    ) -> CustomerOutcome {
        if !customer.has_contact_info() {
            // Stale or incomplete customer data: surface to the operator,
            // nothing to write to the delivery log.
            warn!(
                "Customer {} ({}) has no email or phone, skipping notification",
                customer.name, customer.id
            );
            return CustomerOutcome {
                sms: None,
                email: None,
                skipped: true,
            };
        }

        let vars = TemplateVars {
            name: customer.name.clone(),
            end_of_month: format_end_of_month(run_date),
            product_url: self.product_url.clone(),
        };
        let rendered = render_notification(template, &vars);

        let sms_attempt = async {
            match customer.phone.as_deref() {
                Some(phone) => Some(self.attempt_sms(phone, &rendered.sms_body).await),
                None => None,
            }
        };
        let email_attempt = async {
            match customer.email.as_deref() {
                Some(email) => {
                    Some(
                        self.attempt_email(email, &rendered.email_subject, &rendered.email_html)
                            .await,
                    )
                }
                None => None,
            }
        };

        // Both channels are attempted even if one fails.
        let (sms, email) = tokio::join!(sms_attempt, email_attempt);

        CustomerOutcome {
            sms,
            email,
            skipped: false,
        }
    }

    async fn attempt_sms(&self, to: &str, body: &str) -> DeliveryStatus {
        match self.sms.send(to, body).await {
            Ok(()) => {
                self.record(NotificationLog {
                    id: Uuid::new_v4(),
                    channel: Channel::Sms.as_str().to_string(),
                    recipient: to.to_string(),
                    status: DeliveryStatus::Sent.as_str().to_string(),
                    message: Some(body.to_string()),
                    error_code: None,
                    error_message: None,
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryStatus::Sent
            }
            Err(e) => {
                self.record(NotificationLog {
                    id: Uuid::new_v4(),
                    channel: Channel::Sms.as_str().to_string(),
                    recipient: to.to_string(),
                    status: DeliveryStatus::Failed.as_str().to_string(),
                    message: None,
                    error_code: e.code.clone(),
                    error_message: Some(e.message),
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryStatus::Failed
            }
        }
    }

    async fn attempt_email(&self, to: &str, subject: &str, html_body: &str) -> DeliveryStatus {
        match self.mail.send(to, subject, html_body).await {
            Ok(()) => {
                self.record(NotificationLog {
                    id: Uuid::new_v4(),
                    channel: Channel::Email.as_str().to_string(),
                    recipient: to.to_string(),
                    status: DeliveryStatus::Sent.as_str().to_string(),
                    message: Some(subject.to_string()),
                    error_code: None,
                    error_message: None,
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryStatus::Sent
            }
            Err(e) => {
                self.record(NotificationLog {
                    id: Uuid::new_v4(),
                    channel: Channel::Email.as_str().to_string(),
                    recipient: to.to_string(),
                    status: DeliveryStatus::Failed.as_str().to_string(),
                    message: None,
                    error_code: e.code.clone(),
                    error_message: Some(e.message),
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryStatus::Failed
            }
        }
    }

    /// Log-write is best-effort: a failed insert is reported to the operator
    /// console and never fails the batch.
    async fn record(&self, log: NotificationLog) {
        if let Err(e) = self.delivery_log.append(&log).await {
            error!(
                "Failed to write notification log for {} ({}): {}",
                log.recipient, log.channel, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::gateway::{GatewayError, MockMailGateway, MockSmsGateway};
    use crate::notifications::store::{MockCustomerStore, MockDeliveryLog, MockTemplateStore};
    use mockall::predicate::eq;
    use std::sync::Mutex;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 20).unwrap()
    }

    fn template() -> NotificationTemplate {
        NotificationTemplate {
            sms_body: "Hi {{name}}!".to_string(),
            sms_updated_at: Utc::now(),
            email_subject: "Filter due, {{name}}".to_string(),
            email_html: "<p>Hello {{name}}, order by {{endOfMonth}}: {{product_url}}</p>"
                .to_string(),
            email_updated_at: Utc::now(),
        }
    }

    fn customer(name: &str, email: Option<&str>, phone: Option<&str>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.map(String::from),
            phone: phone.map(String::from),
            description: None,
            due_date: run_date(),
            created_at: Utc::now(),
        }
    }

    struct Fixture {
        customers: MockCustomerStore,
        templates: MockTemplateStore,
        delivery_log: MockDeliveryLog,
        sms: MockSmsGateway,
        mail: MockMailGateway,
        captured: Arc<Mutex<Vec<NotificationLog>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut templates = MockTemplateStore::new();
            templates
                .expect_find_singleton()
                .returning(|| Ok(Some(template())));

            Self {
                customers: MockCustomerStore::new(),
                templates,
                delivery_log: MockDeliveryLog::new(),
                sms: MockSmsGateway::new(),
                mail: MockMailGateway::new(),
                captured: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn with_due(mut self, due: Vec<Customer>) -> Self {
            self.customers
                .expect_due_on()
                .with(eq(run_date()))
                .returning(move |_| Ok(due.clone()));
            self
        }

        fn capture_logs(mut self) -> Self {
            let captured = self.captured.clone();
            self.delivery_log.expect_append().returning(move |log| {
                captured.lock().unwrap().push(log.clone());
                Ok(())
            });
            self
        }

        fn build(self) -> (DueNotifierJob, Arc<Mutex<Vec<NotificationLog>>>) {
            let job = DueNotifierJob::new(
                Arc::new(self.customers),
                Arc::new(self.templates),
                Arc::new(self.delivery_log),
                Arc::new(self.sms),
                Arc::new(self.mail),
                "https://shop.example.com".to_string(),
            );
            (job, self.captured)
        }
    }

    #[tokio::test]
    async fn test_sms_failure_does_not_suppress_email() {
        let mut fixture = Fixture::new()
            .with_due(vec![customer(
                "Ana",
                Some("ana@example.com"),
                Some("+301234"),
            )])
            .capture_logs();

        fixture.sms.expect_send().times(1).returning(|_, _| {
            Err(GatewayError::new(
                Some("21211".to_string()),
                "invalid number",
            ))
        });
        fixture
            .mail
            .expect_send()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (job, captured) = fixture.build();
        let report = job.run_for_date(run_date()).await.unwrap();

        assert_eq!(report.sms_failed, 1);
        assert_eq!(report.emails_sent, 1);

        let logs = captured.lock().unwrap();
        assert_eq!(logs.len(), 2);

        let sms_log = logs.iter().find(|l| l.channel == "sms").unwrap();
        assert_eq!(sms_log.status, "failed");
        assert_eq!(sms_log.recipient, "+301234");
        assert_eq!(sms_log.error_code.as_deref(), Some("21211"));
        assert_eq!(sms_log.error_message.as_deref(), Some("invalid number"));

        let email_log = logs.iter().find(|l| l.channel == "email").unwrap();
        assert_eq!(email_log.status, "sent");
        assert_eq!(email_log.recipient, "ana@example.com");
    }

    #[tokio::test]
    async fn test_sms_only_customer_produces_single_sent_log() {
        let mut fixture = Fixture::new()
            .with_due(vec![customer("Ana", None, Some("+301234"))])
            .capture_logs();

        fixture
            .sms
            .expect_send()
            .with(eq("+301234"), eq("Hi Ana!"))
            .times(1)
            .returning(|_, _| Ok(()));
        fixture.mail.expect_send().times(0);

        let (job, captured) = fixture.build();
        let report = job.run_for_date(run_date()).await.unwrap();

        assert_eq!(report.customers_due, 1);
        assert_eq!(report.sms_sent, 1);
        assert_eq!(report.emails_sent, 0);
        assert_eq!(report.emails_failed, 0);

        let logs = captured.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].channel, "sms");
        assert_eq!(logs[0].recipient, "+301234");
        assert_eq!(logs[0].status, "sent");
        assert_eq!(logs[0].message.as_deref(), Some("Hi Ana!"));
    }

    #[tokio::test]
    async fn test_customer_without_contact_info_yields_no_logs() {
        let mut fixture = Fixture::new().with_due(vec![customer("Ghost", None, None)]);

        fixture.delivery_log.expect_append().times(0);
        fixture.sms.expect_send().times(0);
        fixture.mail.expect_send().times(0);

        let (job, _) = fixture.build();
        let report = job.run_for_date(run_date()).await.unwrap();

        assert_eq!(report.customers_due, 1);
        assert_eq!(report.skipped_no_contact, 1);
        assert_eq!(report.sms_sent + report.sms_failed, 0);
        assert_eq!(report.emails_sent + report.emails_failed, 0);
    }

    #[tokio::test]
    async fn test_missing_template_aborts_before_any_send() {
        let mut customers = MockCustomerStore::new();
        customers.expect_due_on().times(0);
        let mut templates = MockTemplateStore::new();
        templates.expect_find_singleton().returning(|| Ok(None));
        let mut delivery_log = MockDeliveryLog::new();
        delivery_log.expect_append().times(0);
        let mut sms = MockSmsGateway::new();
        sms.expect_send().times(0);
        let mut mail = MockMailGateway::new();
        mail.expect_send().times(0);

        let job = DueNotifierJob::new(
            Arc::new(customers),
            Arc::new(templates),
            Arc::new(delivery_log),
            Arc::new(sms),
            Arc::new(mail),
            "https://shop.example.com".to_string(),
        );

        let err = job.run_for_date(run_date()).await.unwrap_err();
        assert!(matches!(err, NotifyError::TemplateMissing));
    }

    #[tokio::test]
    async fn test_due_query_failure_is_fatal() {
        let mut fixture = Fixture::new();
        fixture
            .customers
            .expect_due_on()
            .returning(|_| Err(sqlx::Error::PoolTimedOut));
        fixture.sms.expect_send().times(0);
        fixture.mail.expect_send().times(0);
        fixture.delivery_log.expect_append().times(0);

        let (job, _) = fixture.build();
        let err = job.run_for_date(run_date()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Database(_)));
    }

    #[tokio::test]
    async fn test_log_write_failure_does_not_fail_batch() {
        let mut fixture = Fixture::new().with_due(vec![customer("Ana", None, Some("+301234"))]);

        fixture.sms.expect_send().times(1).returning(|_, _| Ok(()));
        fixture.mail.expect_send().times(0);
        fixture
            .delivery_log
            .expect_append()
            .times(1)
            .returning(|_| Err(sqlx::Error::PoolTimedOut));

        let (job, _) = fixture.build();
        let report = job.run_for_date(run_date()).await.unwrap();
        assert_eq!(report.sms_sent, 1);
    }

    #[tokio::test]
    async fn test_one_customer_failure_does_not_stop_others() {
        let mut fixture = Fixture::new()
            .with_due(vec![
                customer("Ana", None, Some("+301234")),
                customer("Bob", None, Some("+305555")),
            ])
            .capture_logs();

        fixture.sms.expect_send().times(2).returning(|to, _| {
            if to == "+305555" {
                Err(GatewayError::message_only("carrier rejected"))
            } else {
                Ok(())
            }
        });
        fixture.mail.expect_send().times(0);

        let (job, captured) = fixture.build();
        let report = job.run_for_date(run_date()).await.unwrap();

        assert_eq!(report.sms_sent, 1);
        assert_eq!(report.sms_failed, 1);
        assert_eq!(captured.lock().unwrap().len(), 2);
    }
}
