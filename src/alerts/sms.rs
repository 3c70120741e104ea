//! SMS provider contract and the Twilio client

use async_trait::async_trait;
use std::time::Duration;

use crate::config::TwilioCredentials;
use crate::provider::{http_client, ProviderError};

pub const TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Send one message from the provider's configured sender number
    async fn send(&self, to: &str, body: &str) -> Result<(), ProviderError>;
}

/// Twilio Programmable Messaging client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    credentials: TwilioCredentials,
    base_url: String,
}

impl TwilioClient {
    pub fn new(credentials: TwilioCredentials, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            credentials,
            base_url: TWILIO_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SmsProvider for TwilioClient {
    async fn send(&self, to: &str, body: &str) -> Result<(), ProviderError> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&[
                ("From", self.credentials.from_number.as_str()),
                ("To", to),
                ("Body", body),
            ])
            .send()
            .await?;

        // Twilio answers 201 Created for an accepted message
        if response.status() != reqwest::StatusCode::CREATED {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        tracing::debug!(to = %to, "SMS accepted by Twilio");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::serve;
    use axum::{
        extract::{Form, Path},
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use std::collections::HashMap;

    fn credentials() -> TwilioCredentials {
        TwilioCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550001111".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_form_with_basic_auth() {
        let router = Router::new().route(
            "/Accounts/:sid/Messages.json",
            post(
                |Path(sid): Path<String>,
                 headers: HeaderMap,
                 Form(form): Form<HashMap<String, String>>| async move {
                    assert_eq!(sid, "AC123");
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    assert!(auth.starts_with("Basic "));
                    assert_eq!(form.get("From").map(String::as_str), Some("+15550001111"));
                    assert_eq!(form.get("To").map(String::as_str), Some("+15552223333"));
                    assert_eq!(form.get("Body").map(String::as_str), Some("hello"));
                    StatusCode::CREATED
                },
            ),
        );
        let base = serve(router).await;
        let client = TwilioClient::new(credentials(), Duration::from_secs(2))
            .unwrap()
            .with_base_url(base);

        assert!(client.send("+15552223333", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_created_status_is_failure() {
        // 200 is still a failure; only 201 means the message was queued
        let router = Router::new().route(
            "/Accounts/:sid/Messages.json",
            post(|| async { StatusCode::OK }),
        );
        let base = serve(router).await;
        let client = TwilioClient::new(credentials(), Duration::from_secs(2))
            .unwrap()
            .with_base_url(base);

        let err = client.send("+15552223333", "hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 200, .. }));
    }
}
