//! # Payment Processor
//!
//! Orchestrates payments over simulated gateways, with heuristic fraud
//! scoring, an append-only audit trail, and retrying customer notifications.
//!
//! ## Design Principles
//!
//! - **Failures are values**: gateway and processor operations return a
//!   [`PaymentResult`] rather than `Err`
//! - **Exact money**: amounts are `rust_decimal` decimals, never floats
//! - **Owned state**: each gateway owns its ledger, the fraud detector its
//!   velocity history, the notification service its retry queue
//! - **Pluggable seams**: gateways, audit storage and notification providers
//!   are async traits
//!
//! ## Example
//!
//! ```no_run
//! use payment_processor::{
//!     Amount, AuditLogger, Customer, FraudDetector, InMemoryAuditStorage,
//!     NotificationService, PaymentProcessor, PaymentRequest, StripeGateway,
//! };
//!
//! # async fn run() {
//! let mut processor = PaymentProcessor::new(
//!     StripeGateway::new("sk_test_xxx"),
//!     FraudDetector::default(),
//!     AuditLogger::new(InMemoryAuditStorage::new()),
//!     NotificationService::default(),
//! );
//!
//! let request = PaymentRequest::new("pay_1", Amount::from(100), "USD", "cust_1", "pm_card");
//! let customer = Customer::new("cust_1", "jane@example.com", "Jane", 0.1);
//! let result = processor.process_payment(&request, &customer).await;
//! assert!(result.is_success());
//! # }
//! ```

pub mod audit;
pub mod batch;
pub mod config;
pub mod error;
pub mod fraud;
pub mod gateways;
pub mod ledger;
pub mod money;
pub mod notification;
pub mod processor;
pub mod types;

pub use audit::{AuditEvent, AuditFilter, AuditLogger, AuditStorage, InMemoryAuditStorage, Outcome};
pub use batch::{BatchOp, BatchOutcome, BatchRecord, BatchRunner};
pub use config::{GatewayKind, RunnerConfig};
pub use error::{AuditError, BatchError, NotificationError, PaymentError, Result};
pub use fraud::{FraudCheckResult, FraudConfig, FraudDetector};
pub use gateways::{PayPalGateway, PaymentGateway, StripeGateway};
pub use ledger::{EntryStatus, Ledger, LedgerEntry};
pub use money::Amount;
pub use notification::{
    BatchSummary, Channel, NotificationConfig, NotificationPayload, NotificationProvider,
    NotificationService,
};
pub use processor::PaymentProcessor;
pub use types::{Customer, PaymentRequest, PaymentResult};
