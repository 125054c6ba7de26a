//! Payment orchestration.
//!
//! Every payment runs the same five steps:
//!
//! 1. audit `PAYMENT_INITIATED`
//! 2. fraud check (rejection audits `FRAUD_REJECTED` and stops here)
//! 3. gateway charge
//! 4. audit `PAYMENT_SUCCESS` or `PAYMENT_FAILED`
//! 5. on success, email a confirmation
//!
//! The gateway's result is returned as-is; a failed confirmation email never
//! changes it.

use crate::audit::{AuditEvent, AuditLogger, Outcome};
use crate::error::PaymentError;
use crate::fraud::FraudDetector;
use crate::gateways::PaymentGateway;
use crate::money::Amount;
use crate::notification::{Channel, NotificationPayload, NotificationService};
use crate::types::{Customer, PaymentRequest, PaymentResult};
use log::{info, warn};
use serde_json::json;

pub const PAYMENT_INITIATED: &str = "PAYMENT_INITIATED";
pub const FRAUD_REJECTED: &str = "FRAUD_REJECTED";
pub const PAYMENT_SUCCESS: &str = "PAYMENT_SUCCESS";
pub const PAYMENT_FAILED: &str = "PAYMENT_FAILED";
pub const REFUND_INITIATED: &str = "REFUND_INITIATED";
pub const REFUND_SUCCESS: &str = "REFUND_SUCCESS";
pub const REFUND_FAILED: &str = "REFUND_FAILED";

/// Actor recorded on refund events.
const SYSTEM_ACTOR: &str = "system";

/// Wires a gateway, fraud detector, audit logger and notification service
/// into the payment pipeline. Owns each collaborator exclusively.
pub struct PaymentProcessor {
    gateway: Box<dyn PaymentGateway>,
    fraud_detector: FraudDetector,
    audit_logger: AuditLogger,
    notifications: NotificationService,
}

impl PaymentProcessor {
    pub fn new(
        gateway: impl PaymentGateway + 'static,
        fraud_detector: FraudDetector,
        audit_logger: AuditLogger,
        notifications: NotificationService,
    ) -> Self {
        PaymentProcessor {
            gateway: Box::new(gateway),
            fraud_detector,
            audit_logger,
            notifications,
        }
    }

    pub async fn process_payment(
        &mut self,
        request: &PaymentRequest,
        customer: &Customer,
    ) -> PaymentResult {
        self.audit_logger
            .log(
                &AuditEvent::new(
                    PAYMENT_INITIATED,
                    &customer.id,
                    &request.id,
                    "process_payment",
                    Outcome::Success,
                )
                .with_detail("amount", json!(request.amount))
                .with_detail("currency", request.currency.as_str()),
            )
            .await;

        let fraud = self.fraud_detector.check_transaction(request, customer);
        if !fraud.approved {
            self.audit_logger
                .log(
                    &AuditEvent::new(
                        FRAUD_REJECTED,
                        &customer.id,
                        &request.id,
                        "fraud_check",
                        Outcome::Failure,
                    )
                    .with_detail("reasons", json!(fraud.reasons))
                    .with_detail("riskScore", fraud.risk_score),
                )
                .await;
            return PaymentResult::failed(PaymentError::FraudDeclined);
        }
        if fraud.requires_review {
            warn!(
                "Payment {} needs manual review (risk score {:.2})",
                request.id, fraud.risk_score
            );
        }

        let result = self.gateway.charge(request).await;

        let event_type = if result.is_success() {
            PAYMENT_SUCCESS
        } else {
            PAYMENT_FAILED
        };
        self.audit_logger
            .log(
                &AuditEvent::new(
                    event_type,
                    &customer.id,
                    &request.id,
                    "charge",
                    Outcome::from(result.is_success()),
                )
                .with_detail("transactionId", json!(result.transaction_id())),
            )
            .await;

        if result.is_success() {
            let confirmation = NotificationPayload::new(
                Channel::Email,
                &customer.email,
                "Payment Confirmation",
                format!(
                    "Your payment of {} {} was successful.",
                    request.amount, request.currency
                ),
            );
            if !self.notifications.send(&confirmation).await {
                warn!("Confirmation for payment {} was not delivered", request.id);
            }
            info!(
                "Payment {} charged via {}",
                request.id,
                self.gateway.name()
            );
        }

        result
    }

    pub async fn refund_payment(
        &mut self,
        transaction_id: &str,
        amount: Amount,
        reason: &str,
    ) -> PaymentResult {
        self.audit_logger
            .log(
                &AuditEvent::new(
                    REFUND_INITIATED,
                    SYSTEM_ACTOR,
                    transaction_id,
                    "refund",
                    Outcome::Success,
                )
                .with_detail("amount", json!(amount))
                .with_detail("reason", reason),
            )
            .await;

        let result = self.gateway.refund(transaction_id, amount).await;

        let event_type = if result.is_success() {
            REFUND_SUCCESS
        } else {
            REFUND_FAILED
        };
        self.audit_logger
            .log(&AuditEvent::new(
                event_type,
                SYSTEM_ACTOR,
                transaction_id,
                "refund_complete",
                Outcome::from(result.is_success()),
            ))
            .await;

        result
    }

    pub async fn transaction_status(&self, transaction_id: &str) -> String {
        self.gateway.status(transaction_id).await
    }

    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    pub fn fraud_detector(&self) -> &FraudDetector {
        &self.fraud_detector
    }

    pub fn audit_logger(&self) -> &AuditLogger {
        &self.audit_logger
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationService {
        &mut self.notifications
    }
}
