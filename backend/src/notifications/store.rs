//! Persistence seams for the due-date notifier.
//!
//! The batch job talks to the database through these traits so the
//! dispatcher can be exercised in tests with mocked stores. The Postgres
//! implementations are thin wrappers over the shared pool.

use async_trait::async_trait;
use chrono::NaiveDate;
use duetrack_shared::{Customer, NotificationLog, NotificationTemplate};
use sqlx::PgPool;

/// Read access to customer records for due-date selection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// All customers whose due date equals `date`, exact calendar-day match.
    async fn due_on(&self, date: NaiveDate) -> Result<Vec<Customer>, sqlx::Error>;
}

/// Read access to the singleton notification template.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find_singleton(&self) -> Result<Option<NotificationTemplate>, sqlx::Error>;
}

/// Append-only delivery log. One row per attempt, never conditional on
/// prior rows existing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn append(&self, log: &NotificationLog) -> Result<(), sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn due_on(&self, date: NaiveDate) -> Result<Vec<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone, description, due_date, created_at
             FROM customers
             WHERE due_date = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn find_singleton(&self) -> Result<Option<NotificationTemplate>, sqlx::Error> {
        sqlx::query_as::<_, NotificationTemplate>(
            "SELECT sms_body, sms_updated_at, email_subject, email_html, email_updated_at
             FROM notification_templates",
        )
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct PgDeliveryLog {
    pool: PgPool,
}

impl PgDeliveryLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLog for PgDeliveryLog {
    async fn append(&self, log: &NotificationLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_logs
             (id, channel, recipient, status, message, error_code, error_message, sent_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(log.id)
        .bind(&log.channel)
        .bind(&log.recipient)
        .bind(&log.status)
        .bind(&log.message)
        .bind(&log.error_code)
        .bind(&log.error_message)
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
