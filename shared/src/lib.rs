use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String, // admin, staff
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    /// Next service due date (calendar day, no time component)
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// A customer with neither email nor phone cannot be notified.
    pub fn has_contact_info(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

/// Singleton message template document, edited from the admin settings form
/// and read once per notification batch run.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub sms_body: String,
    pub sms_updated_at: DateTime<Utc>,
    pub email_subject: String,
    pub email_html: String,
    pub email_updated_at: DateTime<Utc>,
}

/// Delivery channel for one notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// One delivery attempt, success or failure. Append-only: rows are written
/// by the notification batch and never updated or deleted. The recipient is
/// a denormalised copy of the contact address at send time, so historical
/// logs survive customer edits and deletions.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLog {
    pub id: Uuid,
    pub channel: String,   // sms, email
    pub recipient: String, // phone number or email address as sent
    pub status: String,    // sent, failed
    pub message: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_labels() {
        assert_eq!(Channel::Sms.as_str(), "sms");
        assert_eq!(Channel::Email.as_str(), "email");
        assert_eq!(DeliveryStatus::Sent.as_str(), "sent");
        assert_eq!(DeliveryStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_customer_contact_info() {
        let mut customer = Customer {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: None,
            phone: Some("+301234".to_string()),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 20).unwrap(),
            created_at: Utc::now(),
        };
        assert!(customer.has_contact_info());

        customer.phone = None;
        assert!(!customer.has_contact_info());
    }
}
