use async_trait::async_trait;

/// Failure payload from a delivery channel, normalised across gateways so
/// failure logging is uniform regardless of which provider raised it. The
/// code is transport-specific (e.g. Twilio "21211") and not always present.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub code: Option<String>,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Text-message delivery channel. One call is one attempt; the gateway does
/// not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError>;
}

/// Transactional email delivery channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailGateway: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), GatewayError>;
}
