use crate::gateways::{check_charge_amount, redact, PaymentGateway};
use crate::ledger::{EntryStatus, Ledger};
use crate::money::Amount;
use crate::types::{PaymentRequest, PaymentResult};
use log::debug;
use serde_json::json;
use std::fmt;
use uuid::Uuid;

/// Simulated PayPal backend.
///
/// Orders are created and captured in one step. PayPal allows larger charges
/// than Stripe (up to 25,000) and reports statuses in upper case.
pub struct PayPalGateway {
    client_id: String,
    client_secret: String,
    orders: Ledger,
}

impl PayPalGateway {
    pub const LIMIT: i64 = 25_000;
    pub const NOT_FOUND: &'static str = "NOT_FOUND";

    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        PayPalGateway {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            orders: Ledger::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.orders
    }

    fn status_label(status: EntryStatus) -> &'static str {
        match status {
            EntryStatus::Completed => "COMPLETED",
            EntryStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Debug for PayPalGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayPalGateway")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("orders", &self.orders.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for PayPalGateway {
    fn name(&self) -> &'static str {
        "PayPal"
    }

    async fn charge(&mut self, request: &PaymentRequest) -> PaymentResult {
        tokio::task::yield_now().await;

        if let Err(e) = check_charge_amount(request.amount, Amount::from(Self::LIMIT), self.name()) {
            debug!("paypal: rejected order for {}: {}", request.id, e);
            return PaymentResult::failed(e);
        }

        let order_id = format!("paypal_{}", Uuid::new_v4().simple());
        self.orders.record_charge(&order_id, request.amount);
        debug!(
            "paypal: captured {} {} as {}",
            request.amount, request.currency, order_id
        );

        PaymentResult::charged(
            order_id.clone(),
            json!({
                "provider": "paypal",
                "orderId": order_id,
                "captureId": format!("capture_{}", order_id),
            }),
        )
    }

    async fn refund(&mut self, transaction_id: &str, amount: Amount) -> PaymentResult {
        tokio::task::yield_now().await;

        match self.orders.refund(transaction_id, amount) {
            Ok(remaining) => {
                debug!(
                    "paypal: refunded {} on {}, {} remaining",
                    amount, transaction_id, remaining
                );
                PaymentResult::refunded(format!("refund_{}", transaction_id))
            }
            Err(e) => PaymentResult::failed(e),
        }
    }

    async fn status(&self, transaction_id: &str) -> String {
        self.orders
            .status(transaction_id)
            .map(Self::status_label)
            .unwrap_or(Self::NOT_FOUND)
            .to_string()
    }

    fn validate_payment_method(&self, payment_method_id: &str) -> bool {
        payment_method_id.starts_with("paypal_") || payment_method_id.contains('@')
    }
}
