use crate::gateways::{check_charge_amount, redact, PaymentGateway};
use crate::ledger::{EntryStatus, Ledger};
use crate::money::Amount;
use crate::types::{PaymentRequest, PaymentResult};
use log::debug;
use serde_json::json;
use std::fmt;
use uuid::Uuid;

/// Simulated Stripe backend. Charges above 10,000 are refused.
pub struct StripeGateway {
    api_key: String,
    transactions: Ledger,
}

impl StripeGateway {
    pub const LIMIT: i64 = 10_000;
    pub const NOT_FOUND: &'static str = "not_found";

    pub fn new(api_key: impl Into<String>) -> Self {
        StripeGateway {
            api_key: api_key.into(),
            transactions: Ledger::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.transactions
    }

    fn status_label(status: EntryStatus) -> &'static str {
        match status {
            EntryStatus::Completed => "completed",
            EntryStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_key", &redact(&self.api_key))
            .field("transactions", &self.transactions.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        "Stripe"
    }

    async fn charge(&mut self, request: &PaymentRequest) -> PaymentResult {
        tokio::task::yield_now().await;

        if let Err(e) = check_charge_amount(request.amount, Amount::from(Self::LIMIT), self.name()) {
            debug!("stripe: rejected charge for {}: {}", request.id, e);
            return PaymentResult::failed(e);
        }

        let transaction_id = format!("stripe_{}", Uuid::new_v4().simple());
        self.transactions.record_charge(&transaction_id, request.amount);
        debug!(
            "stripe: charged {} {} as {}",
            request.amount, request.currency, transaction_id
        );

        PaymentResult::charged(
            transaction_id.clone(),
            json!({ "provider": "stripe", "chargeId": transaction_id }),
        )
    }

    async fn refund(&mut self, transaction_id: &str, amount: Amount) -> PaymentResult {
        tokio::task::yield_now().await;

        match self.transactions.refund(transaction_id, amount) {
            Ok(remaining) => {
                debug!(
                    "stripe: refunded {} on {}, {} remaining",
                    amount, transaction_id, remaining
                );
                PaymentResult::refunded(format!("refund_{}", transaction_id))
            }
            Err(e) => PaymentResult::failed(e),
        }
    }

    async fn status(&self, transaction_id: &str) -> String {
        self.transactions
            .status(transaction_id)
            .map(Self::status_label)
            .unwrap_or(Self::NOT_FOUND)
            .to_string()
    }

    fn validate_payment_method(&self, payment_method_id: &str) -> bool {
        payment_method_id.starts_with("pm_")
    }
}
