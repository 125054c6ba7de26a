//! Runtime configuration for the `payment-processor` binary.
//!
//! The library components take plain config values; only the binary reads
//! the environment.

use crate::audit::{AuditLogger, InMemoryAuditStorage};
use crate::error::{BatchError, Result};
use crate::fraud::{FraudConfig, FraudDetector};
use crate::gateways::{PayPalGateway, StripeGateway};
use crate::notification::{NotificationConfig, NotificationService};
use crate::processor::PaymentProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Stripe,
    PayPal,
}

impl std::str::FromStr for GatewayKind {
    type Err = BatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" => Ok(GatewayKind::Stripe),
            "paypal" => Ok(GatewayKind::PayPal),
            other => Err(BatchError::UnknownGateway(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub gateway: GatewayKind,
    pub stripe_api_key: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    /// Environment tag stamped on every audit event.
    pub environment: String,
    pub retry_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            gateway: GatewayKind::Stripe,
            stripe_api_key: "sk_test_local".to_string(),
            paypal_client_id: "paypal-sandbox".to_string(),
            paypal_client_secret: "paypal-sandbox-secret".to_string(),
            environment: AuditLogger::DEFAULT_ENVIRONMENT.to_string(),
            retry_attempts: NotificationConfig::default().retry_attempts,
        }
    }
}

impl RunnerConfig {
    /// Reads `PAYMENTS_GATEWAY`, `STRIPE_API_KEY`, `PAYPAL_CLIENT_ID`,
    /// `PAYPAL_CLIENT_SECRET`, `PAYMENTS_ENV` and `NOTIFY_RETRY_ATTEMPTS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for anything missing. A malformed retry count also falls back.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let gateway = match lookup("PAYMENTS_GATEWAY") {
            Some(name) => name.parse()?,
            None => defaults.gateway,
        };

        Ok(RunnerConfig {
            gateway,
            stripe_api_key: lookup("STRIPE_API_KEY").unwrap_or(defaults.stripe_api_key),
            paypal_client_id: lookup("PAYPAL_CLIENT_ID").unwrap_or(defaults.paypal_client_id),
            paypal_client_secret: lookup("PAYPAL_CLIENT_SECRET")
                .unwrap_or(defaults.paypal_client_secret),
            environment: lookup("PAYMENTS_ENV").unwrap_or(defaults.environment),
            retry_attempts: lookup("NOTIFY_RETRY_ATTEMPTS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.retry_attempts),
        })
    }

    /// Assembles a processor with in-memory audit storage.
    pub fn build_processor(&self) -> PaymentProcessor {
        let audit_logger =
            AuditLogger::new(InMemoryAuditStorage::new()).with_environment(self.environment.clone());
        let notifications = NotificationService::new(NotificationConfig {
            retry_attempts: self.retry_attempts,
            ..NotificationConfig::default()
        });
        let fraud_detector = FraudDetector::new(FraudConfig::default());

        match self.gateway {
            GatewayKind::Stripe => PaymentProcessor::new(
                StripeGateway::new(self.stripe_api_key.clone()),
                fraud_detector,
                audit_logger,
                notifications,
            ),
            GatewayKind::PayPal => PaymentProcessor::new(
                PayPalGateway::new(self.paypal_client_id.clone(), self.paypal_client_secret.clone()),
                fraud_detector,
                audit_logger,
                notifications,
            ),
        }
    }
}
