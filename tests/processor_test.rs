//! End-to-end tests for the payment pipeline through the public API.

use payment_processor::{
    Amount, AuditEvent, AuditFilter, AuditLogger, Channel, Customer, FraudConfig, FraudDetector,
    InMemoryAuditStorage, NotificationConfig, NotificationError, NotificationPayload,
    NotificationProvider, NotificationService, Outcome, PayPalGateway, PaymentError,
    PaymentGateway, PaymentProcessor, PaymentRequest, StripeGateway,
};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn test_customer(risk: f64) -> Customer {
    Customer::new("cust_123", "test@example.com", "Test User", risk)
}

fn test_request(amount: &str) -> PaymentRequest {
    PaymentRequest::new(
        "pay_123",
        Amount::from_str(amount).unwrap(),
        "USD",
        "cust_123",
        "pm_test",
    )
}

fn stripe_processor(notifications: NotificationService) -> PaymentProcessor {
    PaymentProcessor::new(
        StripeGateway::new("sk_test_xxx"),
        FraudDetector::default(),
        AuditLogger::new(InMemoryAuditStorage::new()),
        notifications,
    )
}

/// Email provider that is always down.
struct DownEmail {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl NotificationProvider for DownEmail {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, _payload: &NotificationPayload) -> Result<bool, NotificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

// ==================== PAYMENT PROCESSOR ====================

#[tokio::test]
async fn test_valid_payment_succeeds() {
    let mut processor = stripe_processor(NotificationService::default());
    let result = processor
        .process_payment(&test_request("100"), &test_customer(0.1))
        .await;

    assert!(result.is_success());
    assert!(result.transaction_id().is_some());
    assert!(processor.notifications().queued().is_empty());
}

#[tokio::test]
async fn test_zero_amount_payment_fails() {
    let mut processor = stripe_processor(NotificationService::default());
    let result = processor
        .process_payment(&test_request("0"), &test_customer(0.1))
        .await;

    assert!(!result.is_success());
    assert!(result.error_message().is_some());
}

#[tokio::test]
async fn test_high_risk_customer_is_declined() {
    let mut processor = stripe_processor(NotificationService::default());
    let result = processor
        .process_payment(&test_request("100"), &test_customer(0.9))
        .await;

    assert!(!result.is_success());
    assert!(result.error_message().unwrap().contains("fraud"));
}

#[tokio::test]
async fn test_refund_of_processed_payment() {
    let mut processor = stripe_processor(NotificationService::default());
    let payment = processor
        .process_payment(&test_request("100"), &test_customer(0.1))
        .await;
    let tx = payment.transaction_id().unwrap().to_string();

    let refund = processor
        .refund_payment(&tx, Amount::from(50), "Customer request")
        .await;
    assert!(refund.is_success());
    assert_eq!(processor.transaction_status(&tx).await, "refunded");
}

#[tokio::test]
async fn test_refund_of_unknown_transaction_fails() {
    let mut processor = stripe_processor(NotificationService::default());
    let result = processor
        .refund_payment("invalid_tx", Amount::from(100), "Test")
        .await;

    assert!(!result.is_success());
    assert!(result.error_message().unwrap().contains("not found"));
}

#[tokio::test(start_paused = true)]
async fn test_notification_failure_does_not_change_result() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut notifications = NotificationService::default();
    notifications.register_provider(DownEmail {
        calls: Arc::clone(&calls),
    });

    let mut processor = stripe_processor(notifications);
    let result = processor
        .process_payment(&test_request("100"), &test_customer(0.1))
        .await;

    assert!(result.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let queued = processor.notifications().queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].recipient, "test@example.com");
    assert_eq!(queued[0].body, "Your payment of 100 USD was successful.");
}

#[tokio::test]
async fn test_no_notification_for_failed_charge() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut notifications = NotificationService::new(NotificationConfig {
        retry_attempts: 1,
        backoff_step: Duration::ZERO,
    });
    notifications.register_provider(DownEmail {
        calls: Arc::clone(&calls),
    });

    let mut processor = stripe_processor(notifications);
    processor
        .process_payment(&test_request("10001"), &test_customer(0.1))
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_processor_with_paypal_gateway() {
    let mut processor = PaymentProcessor::new(
        PayPalGateway::new("client", "secret"),
        FraudDetector::default(),
        AuditLogger::new(InMemoryAuditStorage::new()),
        NotificationService::default(),
    );

    let result = processor
        .process_payment(&test_request("12500.25"), &test_customer(0.1))
        .await;
    let tx = result.transaction_id().unwrap();
    assert_eq!(processor.transaction_status(tx).await, "COMPLETED");
    assert_eq!(processor.transaction_status("nope").await, "NOT_FOUND");
}

#[tokio::test]
async fn test_audit_trail_per_customer() {
    let mut processor = stripe_processor(NotificationService::default());
    processor
        .process_payment(&test_request("100"), &test_customer(0.1))
        .await;
    processor
        .process_payment(&test_request("100"), &test_customer(0.95))
        .await;

    let by_actor = processor
        .audit_logger()
        .events_by_actor("cust_123")
        .await
        .unwrap();
    let types: Vec<_> = by_actor.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "PAYMENT_INITIATED",
            "PAYMENT_SUCCESS",
            "PAYMENT_INITIATED",
            "FRAUD_REJECTED"
        ]
    );

    let failed = processor.audit_logger().failed_events().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].outcome, Outcome::Failure);
}

// ==================== GATEWAY PROPERTIES ====================

#[tokio::test]
async fn test_non_positive_amounts_never_allocate_ids() {
    let mut stripe = StripeGateway::new("sk_test_xxx");
    let mut paypal = PayPalGateway::new("client", "secret");

    for amount in ["0", "-0.0001", "-100"] {
        let request = test_request(amount);
        for result in [stripe.charge(&request).await, paypal.charge(&request).await] {
            assert_eq!(result.error(), Some(&PaymentError::InvalidAmount));
            assert!(result.transaction_id().is_none());
        }
    }
    assert!(stripe.ledger().is_empty());
    assert!(paypal.ledger().is_empty());
}

#[tokio::test]
async fn test_refund_decrements_by_exact_amount() {
    let mut gateway = StripeGateway::new("sk_test_xxx");
    let charge = gateway.charge(&test_request("99.99")).await;
    let tx = charge.transaction_id().unwrap().to_string();

    gateway.refund(&tx, Amount::from_str("0.99").unwrap()).await;
    assert_eq!(
        gateway.ledger().get(&tx).unwrap().remaining,
        Amount::from(99)
    );

    let rejected = gateway.refund(&tx, Amount::from_str("99.01").unwrap()).await;
    assert!(matches!(
        rejected.error(),
        Some(PaymentError::AmountExceedsOriginal { .. })
    ));
    assert_eq!(
        gateway.ledger().get(&tx).unwrap().remaining,
        Amount::from(99)
    );
}

// ==================== FRAUD DETECTOR ====================

#[tokio::test]
async fn test_velocity_scenario() {
    let mut detector = FraudDetector::new(FraudConfig {
        velocity_window: Duration::from_secs(60),
        max_transactions_per_window: 3,
        ..FraudConfig::default()
    });
    let customer = Customer::new("cust_velocity", "test@example.com", "Test", 0.1);

    for i in 0..4 {
        let request = PaymentRequest::new(
            format!("pay_{}", i),
            Amount::from(50),
            "USD",
            "cust_velocity",
            "pm_1",
        );
        detector.check_transaction(&request, &customer);
    }

    let final_request =
        PaymentRequest::new("pay_final", Amount::from(50), "USD", "cust_velocity", "pm_1");
    let result = detector.check_transaction(&final_request, &customer);
    assert!(result.risk_score > 0.1);
    assert!((detector.risk_score("cust_velocity") - 0.25).abs() < 1e-9);
}

// ==================== AUDIT LOGGER ====================

#[tokio::test]
async fn test_audit_query_by_actor() {
    let mut logger = AuditLogger::new(InMemoryAuditStorage::new());
    for (i, actor) in ["alice", "bob", "alice", "carol"].iter().enumerate() {
        logger
            .log(&AuditEvent::new(
                format!("EVENT_{}", i),
                *actor,
                "res",
                "act",
                Outcome::Success,
            ))
            .await;
    }

    let alice = logger.query(&AuditFilter::actor("alice")).await.unwrap();
    let types: Vec<_> = alice.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["EVENT_0", "EVENT_2"]);

    assert_eq!(logger.query(&AuditFilter::default()).await.unwrap().len(), 4);
}
