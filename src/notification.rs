//! Channel-routed notifications with bounded retry.
//!
//! Each send makes up to `retry_attempts` tries, sleeping `attempt × backoff_step`
//! between tries (linear, never after the last one). Payloads that exhaust
//! their attempts are parked in an in-memory queue for one more best-effort
//! pass via [`NotificationService::process_queue`].

use crate::error::NotificationError;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

const SMS_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
    Webhook,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::Webhook => "webhook",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub channel: Channel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl NotificationPayload {
    pub fn new(
        channel: Channel,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        NotificationPayload {
            channel,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            metadata: None,
        }
    }
}

/// A channel-specific sender.
///
/// `Ok(false)` and `Err(_)` are both treated as a failed attempt.
#[async_trait::async_trait]
pub trait NotificationProvider: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, payload: &NotificationPayload) -> Result<bool, NotificationError>;
}

#[derive(Debug, Default)]
pub struct EmailProvider;

#[async_trait::async_trait]
impl NotificationProvider for EmailProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<bool, NotificationError> {
        tokio::task::yield_now().await;
        info!("[EMAIL] To: {}, Subject: {}", payload.recipient, payload.subject);
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct SmsProvider;

#[async_trait::async_trait]
impl NotificationProvider for SmsProvider {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<bool, NotificationError> {
        tokio::task::yield_now().await;
        info!("[SMS] To: {}: {}", payload.recipient, truncate_sms(&payload.body));
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct WebhookProvider;

#[async_trait::async_trait]
impl NotificationProvider for WebhookProvider {
    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<bool, NotificationError> {
        let body = serde_json::to_string(payload)?;
        tokio::task::yield_now().await;
        info!("[WEBHOOK] POST {}: {}", payload.recipient, body);
        Ok(true)
    }
}

fn truncate_sms(body: &str) -> String {
    body.chars().take(SMS_MAX_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub retry_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `n × backoff_step`.
    pub backoff_step: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            retry_attempts: 3,
            backoff_step: Duration::from_millis(1000),
        }
    }
}

/// Counts from [`NotificationService::send_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
}

pub struct NotificationService {
    config: NotificationConfig,
    providers: HashMap<Channel, Box<dyn NotificationProvider>>,
    queue: Vec<NotificationPayload>,
}

impl NotificationService {
    /// Creates a service with the email, SMS and webhook providers registered.
    pub fn new(config: NotificationConfig) -> Self {
        let mut service = NotificationService {
            config,
            providers: HashMap::new(),
            queue: Vec::new(),
        };
        service.register_provider(EmailProvider);
        service.register_provider(SmsProvider);
        service.register_provider(WebhookProvider);
        service
    }

    /// Registers a provider, replacing any existing one for its channel.
    pub fn register_provider(&mut self, provider: impl NotificationProvider + 'static) {
        self.providers.insert(provider.channel(), Box::new(provider));
    }

    pub fn has_provider(&self, channel: Channel) -> bool {
        self.providers.contains_key(&channel)
    }

    /// Delivers `payload`, queueing it if every attempt fails.
    ///
    /// Returns `false` straight away, without queueing, when no provider is
    /// registered for the channel.
    pub async fn send(&mut self, payload: &NotificationPayload) -> bool {
        match self.deliver(payload).await {
            Some(true) => true,
            Some(false) => {
                self.queue.push(payload.clone());
                false
            }
            None => false,
        }
    }

    /// Sends each payload in order.
    pub async fn send_batch(&mut self, payloads: &[NotificationPayload]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for payload in payloads {
            if self.send(payload).await {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Snapshot of payloads waiting for reprocessing.
    pub fn queued(&self) -> Vec<NotificationPayload> {
        self.queue.clone()
    }

    /// Drains the queue and retries each payload once more through the full
    /// retry loop. Payloads that fail again are dropped, not requeued.
    ///
    /// Returns how many were delivered on this pass.
    pub async fn process_queue(&mut self) -> usize {
        let pending = std::mem::take(&mut self.queue);
        let mut delivered = 0;

        for payload in &pending {
            if self.deliver(payload).await == Some(true) {
                delivered += 1;
            } else {
                warn!(
                    "Dropping {} notification to {} after reprocessing",
                    payload.channel, payload.recipient
                );
            }
        }

        delivered
    }

    /// Runs the retry loop. `None` means no provider for the channel.
    async fn deliver(&self, payload: &NotificationPayload) -> Option<bool> {
        let provider = match self.providers.get(&payload.channel) {
            Some(p) => p,
            None => {
                error!("No provider registered for channel: {}", payload.channel);
                return None;
            }
        };

        let attempts = self.config.retry_attempts;
        for attempt in 1..=attempts {
            match provider.send(payload).await {
                Ok(true) => return Some(true),
                Ok(false) => warn!(
                    "Notification attempt {}/{} to {} was rejected",
                    attempt, attempts, payload.recipient
                ),
                Err(e) => warn!("Notification attempt {}/{} failed: {}", attempt, attempts, e),
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.backoff_step * attempt).await;
            }
        }

        Some(false)
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

impl fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut channels: Vec<_> = self.providers.keys().map(ToString::to_string).collect();
        channels.sort();
        f.debug_struct("NotificationService")
            .field("config", &self.config)
            .field("channels", &channels)
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyProvider {
        channel: Channel,
        failures: usize,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl NotificationProvider for FlakyProvider {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn send(&self, _payload: &NotificationPayload) -> Result<bool, NotificationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(NotificationError::Provider {
                    channel: self.channel.to_string(),
                    message: "connection reset".to_string(),
                })
            } else {
                Ok(true)
            }
        }
    }

    fn flaky(channel: Channel, failures: usize) -> (FlakyProvider, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FlakyProvider {
            channel,
            failures,
            calls: Arc::clone(&calls),
        };
        (provider, calls)
    }

    fn email(recipient: &str) -> NotificationPayload {
        NotificationPayload::new(Channel::Email, recipient, "Hello", "Body")
    }

    #[test]
    fn test_truncate_sms() {
        let long = "x".repeat(200);
        assert_eq!(truncate_sms(&long).len(), 160);
        assert_eq!(truncate_sms("short"), "short");
    }

    #[test]
    fn test_default_providers() {
        let service = NotificationService::default();
        assert!(service.has_provider(Channel::Email));
        assert!(service.has_provider(Channel::Sms));
        assert!(service.has_provider(Channel::Webhook));
        assert!(!service.has_provider(Channel::Push));
    }

    #[tokio::test]
    async fn test_default_providers_deliver() {
        let mut service = NotificationService::default();
        let payloads = vec![
            email("a@example.com"),
            NotificationPayload::new(Channel::Sms, "+15550100", "", "x".repeat(300)),
            NotificationPayload::new(Channel::Webhook, "https://hooks.example.com", "evt", "{}"),
        ];

        let summary = service.send_batch(&payloads).await;
        assert_eq!(summary, BatchSummary { sent: 3, failed: 0 });
        assert!(service.queued().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_channel_fails_without_queueing() {
        let mut service = NotificationService::default();
        let mut counters = Vec::new();
        for channel in [Channel::Email, Channel::Sms, Channel::Webhook] {
            let (provider, calls) = flaky(channel, 0);
            service.register_provider(provider);
            counters.push(calls);
        }
        let push = NotificationPayload::new(Channel::Push, "device-1", "Hi", "Body");

        assert!(!service.send(&push).await);
        assert!(service.queued().is_empty());
        for calls in &counters {
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_queue_payload() {
        let mut service = NotificationService::default();
        let (provider, calls) = flaky(Channel::Email, usize::MAX);
        service.register_provider(provider);

        let start = Instant::now();
        assert!(!service.send(&email("a@example.com")).await);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(service.queued(), vec![email("a@example.com")]);
        // 1s after the first attempt, 2s after the second, none after the third
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failure() {
        let mut service = NotificationService::default();
        let (provider, calls) = flaky(Channel::Email, 1);
        service.register_provider(provider);

        assert!(service.send(&email("a@example.com")).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(service.queued().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_attempts() {
        let mut service = NotificationService::new(NotificationConfig {
            retry_attempts: 5,
            backoff_step: Duration::from_millis(10),
        });
        let (provider, calls) = flaky(Channel::Sms, usize::MAX);
        service.register_provider(provider);

        let payload = NotificationPayload::new(Channel::Sms, "+15550100", "", "code 1234");
        assert!(!service.send(&payload).await);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_batch_counts() {
        let mut service = NotificationService::default();
        let (provider, _calls) = flaky(Channel::Sms, usize::MAX);
        service.register_provider(provider);

        let payloads = vec![
            email("a@example.com"),
            NotificationPayload::new(Channel::Sms, "+15550100", "", "hi"),
            NotificationPayload::new(Channel::Push, "device-1", "", "hi"),
            email("b@example.com"),
        ];

        let summary = service.send_batch(&payloads).await;
        assert_eq!(summary, BatchSummary { sent: 2, failed: 2 });
        assert_eq!(service.queued().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_queue_drains_unconditionally() {
        let mut service = NotificationService::default();
        // 3 failures exhaust the first send, then the 4th call succeeds
        let (provider, _calls) = flaky(Channel::Email, 3);
        service.register_provider(provider);

        assert!(!service.send(&email("a@example.com")).await);
        assert_eq!(service.queued().len(), 1);
        assert_eq!(service.process_queue().await, 1);
        assert!(service.queued().is_empty());

        let (always_down, _calls) = flaky(Channel::Email, usize::MAX);
        service.register_provider(always_down);
        assert!(!service.send(&email("b@example.com")).await);
        assert_eq!(service.process_queue().await, 0);
        assert!(service.queued().is_empty());
    }
}
