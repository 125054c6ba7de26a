//! Heuristic fraud scoring.
//!
//! A transaction's score starts at the customer's baseline and picks up a
//! fixed penalty for each failed check:
//!
//! | Check | Penalty |
//! |---|---|
//! | velocity (too many attempts inside the window) | +0.20 |
//! | amount anomaly (large or suspiciously round) | +0.15 |
//! | high-risk geography (`metadata.country`) | +0.25 |
//!
//! The final score is clamped to `[0, 1]`.

use crate::money::Amount;
use crate::types::{Customer, PaymentRequest};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

const VELOCITY_PENALTY: f64 = 0.2;
const AMOUNT_PENALTY: f64 = 0.15;
const GEOGRAPHY_PENALTY: f64 = 0.25;

/// Scores at or above this (but under the rejection threshold) need review.
const REVIEW_THRESHOLD: f64 = 0.5;

const LARGE_AMOUNT: i64 = 5000;
const ROUND_AMOUNT_STEP: i64 = 1000;

const HIGH_RISK_COUNTRIES: [&str; 3] = ["XX", "YY", "ZZ"];

/// Detector tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudConfig {
    /// Trailing window for the velocity check.
    pub velocity_window: Duration,
    pub max_transactions_per_window: usize,
    /// Scores at or above this are rejected.
    pub high_risk_threshold: f64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        FraudConfig {
            velocity_window: Duration::from_secs(3600),
            max_transactions_per_window: 10,
            high_risk_threshold: 0.7,
        }
    }
}

/// Verdict for a single transaction. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudCheckResult {
    pub approved: bool,
    pub risk_score: f64,
    /// One entry per failed check, in check order.
    pub reasons: Vec<String>,
    pub requires_review: bool,
}

/// Scores transactions and tracks per-customer velocity.
#[derive(Debug, Default)]
pub struct FraudDetector {
    config: FraudConfig,

    /// Attempt timestamps per customer, pruned to the velocity window on
    /// every record.
    recent_transactions: HashMap<String, Vec<Instant>>,
}

impl FraudDetector {
    pub fn new(config: FraudConfig) -> Self {
        FraudDetector {
            config,
            recent_transactions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    /// Scores a transaction.
    ///
    /// Every call is recorded against the customer's velocity history,
    /// whether or not it ends up approved.
    pub fn check_transaction(
        &mut self,
        request: &PaymentRequest,
        customer: &Customer,
    ) -> FraudCheckResult {
        let now = Instant::now();
        let mut reasons = Vec::new();
        let mut risk_score = customer.risk_score;

        if let Some(reason) = self.check_velocity(&customer.id, now) {
            reasons.push(reason.to_string());
            risk_score += VELOCITY_PENALTY;
        }

        if let Some(reason) = check_amount_anomaly(request.amount) {
            reasons.push(reason.to_string());
            risk_score += AMOUNT_PENALTY;
        }

        if let Some(reason) = check_geography(request.metadata_value("country")) {
            reasons.push(reason.to_string());
            risk_score += GEOGRAPHY_PENALTY;
        }

        self.record_transaction(&customer.id, now);

        let risk_score = risk_score.clamp(0.0, 1.0);
        let threshold = self.config.high_risk_threshold;
        let approved = risk_score < threshold;
        let requires_review = (REVIEW_THRESHOLD..threshold).contains(&risk_score);

        if !approved {
            warn!(
                "Payment {} for customer {} scored {:.2}, rejecting: {:?}",
                request.id, customer.id, risk_score, reasons
            );
        } else {
            debug!(
                "Payment {} for customer {} scored {:.2}",
                request.id, customer.id, risk_score
            );
        }

        FraudCheckResult {
            approved,
            risk_score,
            reasons,
            requires_review,
        }
    }

    /// Convenience score from history length alone: `min(0.05 × count, 0.5)`.
    pub fn risk_score(&self, customer_id: &str) -> f64 {
        let count = self
            .recent_transactions
            .get(customer_id)
            .map_or(0, Vec::len);
        (count as f64 * 0.05).min(0.5)
    }

    fn check_velocity(&self, customer_id: &str, now: Instant) -> Option<&'static str> {
        let recent = self
            .recent_transactions
            .get(customer_id)
            .map(|history| {
                history
                    .iter()
                    .filter(|t| self.within_window(**t, now))
                    .count()
            })
            .unwrap_or(0);

        if recent >= self.config.max_transactions_per_window {
            Some("Too many transactions in short time period")
        } else {
            None
        }
    }

    fn record_transaction(&mut self, customer_id: &str, now: Instant) {
        let window = self.config.velocity_window;
        let history = self
            .recent_transactions
            .entry(customer_id.to_string())
            .or_default();
        history.push(now);
        history.retain(|t| now.duration_since(*t) < window);
    }

    fn within_window(&self, at: Instant, now: Instant) -> bool {
        now.duration_since(at) < self.config.velocity_window
    }
}

/// Large amounts take precedence over round ones; at most one fires.
fn check_amount_anomaly(amount: Amount) -> Option<&'static str> {
    if amount > Amount::from(LARGE_AMOUNT) {
        return Some("Unusually large transaction amount");
    }
    if amount > Amount::from(ROUND_AMOUNT_STEP) && amount.is_multiple_of(Amount::from(ROUND_AMOUNT_STEP)) {
        return Some("Suspicious round amount");
    }
    None
}

fn check_geography(country: Option<&str>) -> Option<&'static str> {
    match country {
        Some(c) if HIGH_RISK_COUNTRIES.contains(&c) => Some("Transaction from high-risk region"),
        _ => None,
    }
}
