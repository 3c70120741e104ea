//! Email provider contract and an HTTP mail-relay client

use async_trait::async_trait;
use std::time::Duration;

use super::message::EmailMessage;
use crate::config::MailCredentials;
use crate::provider::{ensure_success, http_client, ProviderError};

/// Relay endpoint used when `MAIL_API_URL` is unset
pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one message from the provider's configured sender address
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), ProviderError>;
}

/// Posts messages as JSON to a transactional mail relay
#[derive(Debug, Clone)]
pub struct HttpMailClient {
    http: reqwest::Client,
    credentials: MailCredentials,
}

impl HttpMailClient {
    pub fn new(credentials: MailCredentials, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            credentials,
        })
    }
}

#[async_trait]
impl EmailProvider for HttpMailClient {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), ProviderError> {
        let payload = serde_json::json!({
            "from": self.credentials.from_address,
            "to": [to],
            "subject": message.subject,
            "text": message.text_body,
            "html": message.html_body,
        });

        let response = self
            .http
            .post(&self.credentials.api_url)
            .bearer_auth(&self.credentials.api_key)
            .json(&payload)
            .send()
            .await?;
        ensure_success(response).await?;

        tracing::debug!(to = %to, "Email accepted by mail relay");
        Ok(())
    }
}
