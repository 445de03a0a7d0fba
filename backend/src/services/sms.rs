use crate::config::TwilioConfig;
use crate::notifications::{GatewayError, SmsGateway};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Text-message gateway speaking the Twilio Messages REST API.
#[derive(Debug, Clone)]
pub struct TwilioSmsGateway {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

/// Error body returned by the Twilio API on a rejected send,
/// e.g. `{"code": 21211, "message": "The 'To' number is invalid", "status": 400}`.
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioSmsGateway {
    pub fn new(config: &TwilioConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl SmsGateway for TwilioSmsGateway {
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| GatewayError::message_only(format!("twilio request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!("SMS sent to {}", to);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        error!("Failed to send SMS to {}: {} {}", to, status, text);

        match serde_json::from_str::<TwilioErrorBody>(&text) {
            Ok(parsed) => Err(GatewayError::new(
                parsed.code.map(|c| c.to_string()),
                parsed
                    .message
                    .unwrap_or_else(|| format!("twilio returned {}", status)),
            )),
            Err(_) if !text.is_empty() => Err(GatewayError::message_only(text)),
            Err(_) => Err(GatewayError::message_only(format!(
                "twilio returned {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> TwilioSmsGateway {
        TwilioSmsGateway::new(&TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+30999".to_string(),
            base_url: server.uri(),
        })
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(body_string_contains("Hi+Ana%21"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM1",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.send("+301234", "Hi Ana!").await.is_ok());
    }

    #[tokio::test]
    async fn test_send_failure_surfaces_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "invalid number",
                "status": 400
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.send("+305555", "Hi!").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("21211"));
        assert_eq!(err.message, "invalid number");
    }

    #[tokio::test]
    async fn test_send_failure_with_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.send("+305555", "Hi!").await.unwrap_err();
        assert_eq!(err.code, None);
        assert_eq!(err.message, "bad gateway");
    }
}
