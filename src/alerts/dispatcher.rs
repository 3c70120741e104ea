//! Alert fan-out across SMS and email

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::email::{EmailProvider, HttpMailClient};
use super::message::{self, AlertContent, EmailMessage};
use super::sms::{SmsProvider, TwilioClient};
use crate::config::FloodConfig;
use crate::model::Subscription;
use crate::provider::{bounded, ProviderError, DEFAULT_PROVIDER_TIMEOUT};

/// Delivery channel used for accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Sms => f.write_str("sms"),
            Channel::Email => f.write_str("email"),
        }
    }
}

/// Per-channel sent/failed counts. Channels with no attempts are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub sent_by_channel: BTreeMap<Channel, usize>,
    pub failed_by_channel: BTreeMap<Channel, usize>,
}

impl DispatchOutcome {
    pub fn sent(&self, channel: Channel) -> usize {
        self.sent_by_channel.get(&channel).copied().unwrap_or(0)
    }

    pub fn failed(&self, channel: Channel) -> usize {
        self.failed_by_channel.get(&channel).copied().unwrap_or(0)
    }

    pub fn total_sent(&self) -> usize {
        self.sent_by_channel.values().sum()
    }

    pub fn total_failed(&self) -> usize {
        self.failed_by_channel.values().sum()
    }

    fn record(&mut self, channel: Channel, delivered: bool) {
        let counts = if delivered {
            &mut self.sent_by_channel
        } else {
            &mut self.failed_by_channel
        };
        *counts.entry(channel).or_insert(0) += 1;
    }
}

/// Result of a one-off test notification. `None` means not attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestNotificationResult {
    pub sms_success: Option<bool>,
    pub email_success: Option<bool>,
}

/// Sends alerts to matched subscribers over every channel they provide.
///
/// An unconfigured provider is not fatal: each message attempted on that
/// channel is counted as failed and the other channel proceeds.
pub struct AlertDispatcher {
    sms: Option<Arc<dyn SmsProvider>>,
    email: Option<Arc<dyn EmailProvider>>,
    /// Max in-flight sends per channel
    concurrency: usize,
    call_timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(
        sms: Option<Arc<dyn SmsProvider>>,
        email: Option<Arc<dyn EmailProvider>>,
    ) -> Self {
        Self {
            sms,
            email,
            concurrency: 8,
            call_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn from_config(config: &FloodConfig) -> Result<Self, ProviderError> {
        let sms: Option<Arc<dyn SmsProvider>> = match &config.twilio {
            Some(credentials) => Some(Arc::new(
                TwilioClient::new(credentials.clone(), config.provider_timeout)?
                    .with_base_url(config.twilio_base_url.clone()),
            )),
            None => {
                tracing::warn!("Twilio credentials not configured; SMS alerts will fail");
                None
            }
        };

        let email: Option<Arc<dyn EmailProvider>> = match &config.mail {
            Some(credentials) => Some(Arc::new(HttpMailClient::new(
                credentials.clone(),
                config.provider_timeout,
            )?)),
            None => {
                tracing::warn!("Mail relay credentials not configured; email alerts will fail");
                None
            }
        };

        Ok(Self::new(sms, email)
            .with_concurrency(config.dispatch_concurrency)
            .with_timeout(config.provider_timeout))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the bound applied to each send
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Send one SMS. Missing credentials and timeouts surface as errors.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<(), ProviderError> {
        let provider = self
            .sms
            .as_ref()
            .ok_or(ProviderError::NotConfigured("SMS"))?;
        bounded(self.call_timeout, provider.send(to, body)).await
    }

    /// Send one email. Missing credentials and timeouts surface as errors.
    pub async fn send_email(&self, to: &str, message: &EmailMessage) -> Result<(), ProviderError> {
        let provider = self
            .email
            .as_ref()
            .ok_or(ProviderError::NotConfigured("Email"))?;
        bounded(self.call_timeout, provider.send(to, message)).await
    }

    /// Notify every subscriber on each channel they have, counting outcomes.
    ///
    /// SMS and email proceed concurrently; within a channel at most
    /// `concurrency` sends are in flight.
    pub async fn dispatch(
        &self,
        content: &AlertContent,
        subscribers: &[Subscription],
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if subscribers.is_empty() {
            return outcome;
        }

        let phones: Vec<String> = subscribers
            .iter()
            .filter_map(|s| s.channels.phone.clone())
            .collect();
        let emails: Vec<String> = subscribers
            .iter()
            .filter_map(|s| s.channels.email.clone())
            .collect();

        if self.sms.is_none() && !phones.is_empty() {
            tracing::warn!(
                recipients = phones.len(),
                "SMS provider not configured; counting all SMS as failed"
            );
        }
        if self.email.is_none() && !emails.is_empty() {
            tracing::warn!(
                recipients = emails.len(),
                "Email provider not configured; counting all email as failed"
            );
        }

        let sms_text = content.sms_text();
        let email = content.email();
        let sms_text = sms_text.as_str();
        let email = &email;

        let sms_batch = stream::iter(phones)
            .map(|to| async move {
                let result = self.send_sms(&to, sms_text).await;
                (to, result)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>();
        let email_batch = stream::iter(emails)
            .map(|to| async move {
                let result = self.send_email(&to, email).await;
                (to, result)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>();

        let (sms_results, email_results) = tokio::join!(sms_batch, email_batch);

        for (channel, results) in [(Channel::Sms, sms_results), (Channel::Email, email_results)] {
            for (to, result) in results {
                match result {
                    Ok(()) => outcome.record(channel, true),
                    Err(ProviderError::NotConfigured(_)) => outcome.record(channel, false),
                    Err(e) => {
                        tracing::warn!(
                            channel = %channel,
                            recipient = %to,
                            error = %e,
                            "Alert delivery failed"
                        );
                        outcome.record(channel, false);
                    }
                }
            }
        }

        tracing::info!(
            location = %content.location_name,
            severity = %content.severity,
            sent = outcome.total_sent(),
            failed = outcome.total_failed(),
            "Alert dispatch finished"
        );

        outcome
    }

    /// Send a test message to verify provider setup
    pub async fn send_test(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> TestNotificationResult {
        let sms_text = message::test_sms_text();
        let test_email = message::test_email();

        let sms = async {
            match phone {
                Some(to) => Some(log_result(
                    Channel::Sms,
                    to,
                    self.send_sms(to, &sms_text).await,
                )),
                None => None,
            }
        };
        let email = async {
            match email {
                Some(to) => Some(log_result(
                    Channel::Email,
                    to,
                    self.send_email(to, &test_email).await,
                )),
                None => None,
            }
        };

        let (sms_success, email_success) = tokio::join!(sms, email);
        TestNotificationResult {
            sms_success,
            email_success,
        }
    }
}

fn log_result(channel: Channel, to: &str, result: Result<(), ProviderError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(channel = %channel, recipient = %to, error = %e, "Notification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactChannels, Location, Severity};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSms {
        fail_for: Vec<String>,
        always_fail: bool,
        delay: Option<Duration>,
        sent: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SmsProvider for FakeSms {
        async fn send(&self, to: &str, body: &str) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(body.starts_with("FLOOD ALERT") || body.starts_with("Test notification"));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.always_fail || self.fail_for.iter().any(|f| f == to) {
                return Err(ProviderError::Status {
                    status: 400,
                    body: "rejected".to_string(),
                });
            }
            self.sent.lock().push(to.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeEmail {
        always_fail: bool,
        sent: Mutex<Vec<(String, String)>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmailProvider for FakeEmail {
        async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.always_fail {
                return Err(ProviderError::Network("connection reset".to_string()));
            }
            self.sent.lock().push((to.to_string(), message.subject.clone()));
            Ok(())
        }
    }

    fn content() -> AlertContent {
        AlertContent::new(
            "Riverside",
            Severity::Critical,
            80.0,
            Location::new(0.0, 0.0).unwrap(),
        )
    }

    fn subscriber(id: u64, email: Option<&str>, phone: Option<&str>) -> Subscription {
        Subscription::new(
            id,
            Location::new(0.0, 0.0).unwrap(),
            5.0,
            Severity::Low,
            ContactChannels::new(email.map(String::from), phone.map(String::from)).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_dispatch_makes_no_calls() {
        let sms = Arc::new(FakeSms::default());
        let email = Arc::new(FakeEmail::default());
        let dispatcher = AlertDispatcher::new(Some(sms.clone()), Some(email.clone()));

        let outcome = dispatcher.dispatch(&content(), &[]).await;

        assert_eq!(outcome, DispatchOutcome::default());
        assert_eq!(outcome.total_sent(), 0);
        assert_eq!(outcome.failed(Channel::Sms), 0);
        assert_eq!(sms.calls.load(Ordering::SeqCst), 0);
        assert_eq!(email.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_channel_failures_are_isolated() {
        let sms = Arc::new(FakeSms {
            always_fail: true,
            ..Default::default()
        });
        let email = Arc::new(FakeEmail::default());
        let dispatcher = AlertDispatcher::new(Some(sms), Some(email.clone()));

        let subscribers = vec![
            subscriber(1, None, Some("+15550000001")),
            subscriber(2, Some("two@example.com"), None),
        ];
        let outcome = dispatcher.dispatch(&content(), &subscribers).await;

        assert_eq!(outcome.sent_by_channel, BTreeMap::from([(Channel::Email, 1)]));
        assert_eq!(outcome.failed_by_channel, BTreeMap::from([(Channel::Sms, 1)]));
        assert_eq!(
            email.sent.lock().clone(),
            vec![(
                "two@example.com".to_string(),
                "Flood Alert: Critical Risk at Riverside".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_one_recipient_failure_does_not_block_others() {
        let sms = Arc::new(FakeSms {
            fail_for: vec!["+15550000002".to_string()],
            ..Default::default()
        });
        let dispatcher =
            AlertDispatcher::new(Some(sms.clone()), Some(Arc::new(FakeEmail::default())))
                .with_concurrency(2);

        let subscribers: Vec<Subscription> = (1..=5)
            .map(|i| subscriber(i, None, Some(format!("+1555000000{}", i).as_str())))
            .collect();
        let outcome = dispatcher.dispatch(&content(), &subscribers).await;

        assert_eq!(outcome.sent(Channel::Sms), 4);
        assert_eq!(outcome.failed(Channel::Sms), 1);
        assert_eq!(sms.calls.load(Ordering::SeqCst), 5);
        assert!(outcome.sent_by_channel.get(&Channel::Email).is_none());
    }

    #[tokio::test]
    async fn test_subscriber_with_both_channels_gets_both() {
        let sms = Arc::new(FakeSms::default());
        let email = Arc::new(FakeEmail::default());
        let dispatcher = AlertDispatcher::new(Some(sms), Some(email));

        let outcome = dispatcher
            .dispatch(
                &content(),
                &[subscriber(1, Some("both@example.com"), Some("+15550000009"))],
            )
            .await;

        assert_eq!(outcome.sent(Channel::Sms), 1);
        assert_eq!(outcome.sent(Channel::Email), 1);
        assert_eq!(outcome.total_failed(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_channel_counts_failures() {
        let email = Arc::new(FakeEmail::default());
        let dispatcher = AlertDispatcher::new(None, Some(email));

        let subscribers = vec![
            subscriber(1, Some("a@example.com"), Some("+15550000001")),
            subscriber(2, None, Some("+15550000002")),
        ];
        let outcome = dispatcher.dispatch(&content(), &subscribers).await;

        assert_eq!(outcome.failed(Channel::Sms), 2);
        assert_eq!(outcome.sent(Channel::Email), 1);
    }

    #[tokio::test]
    async fn test_slow_send_counts_as_failure() {
        let sms = Arc::new(FakeSms {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let dispatcher =
            AlertDispatcher::new(Some(sms), None).with_timeout(Duration::from_millis(30));

        let outcome = dispatcher
            .dispatch(&content(), &[subscriber(1, None, Some("+15550000001"))])
            .await;

        assert_eq!(outcome.failed(Channel::Sms), 1);
        assert_eq!(outcome.sent(Channel::Sms), 0);
    }

    #[tokio::test]
    async fn test_send_test_reports_per_channel() {
        let dispatcher = AlertDispatcher::new(
            Some(Arc::new(FakeSms::default())),
            Some(Arc::new(FakeEmail {
                always_fail: true,
                ..Default::default()
            })),
        );

        let result = dispatcher
            .send_test(Some("+15550000001"), Some("x@example.com"))
            .await;
        assert_eq!(result.sms_success, Some(true));
        assert_eq!(result.email_success, Some(false));

        let result = dispatcher.send_test(None, None).await;
        assert_eq!(result, TestNotificationResult::default());
    }

    #[test]
    fn test_outcome_serializes_channel_names() {
        let mut outcome = DispatchOutcome::default();
        outcome.record(Channel::Email, true);
        outcome.record(Channel::Sms, false);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["sent_by_channel"]["email"], 1);
        assert_eq!(json["failed_by_channel"]["sms"], 1);
    }
}
