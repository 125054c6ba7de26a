//! Payment gateway abstraction and the simulated providers.

use crate::error::PaymentError;
use crate::money::Amount;
use crate::types::{PaymentRequest, PaymentResult};

pub mod paypal;
pub mod stripe;

pub use paypal::PayPalGateway;
pub use stripe::StripeGateway;

/// Capability set every payment backend provides.
///
/// Each implementation owns its own ledger: a transaction id returned by
/// `charge` resolves through `status` and `refund` on the same instance for
/// as long as the instance lives.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Charges the request amount and records it in the ledger.
    async fn charge(&mut self, request: &PaymentRequest) -> PaymentResult;

    /// Refunds part or all of a previous charge.
    async fn refund(&mut self, transaction_id: &str, amount: Amount) -> PaymentResult;

    /// Provider status string for a transaction, or the provider's
    /// not-found sentinel. Never fails.
    async fn status(&self, transaction_id: &str) -> String;

    /// Checks the shape of a payment method id. No side effects.
    fn validate_payment_method(&self, payment_method_id: &str) -> bool;
}

/// Validates a charge amount against a provider ceiling.
pub(crate) fn check_charge_amount(
    amount: Amount,
    limit: Amount,
    provider: &'static str,
) -> Result<(), PaymentError> {
    if !amount.is_positive() {
        return Err(PaymentError::InvalidAmount);
    }
    if amount > limit {
        return Err(PaymentError::LimitExceeded { provider, limit });
    }
    Ok(())
}

/// Masks a credential for `Debug` output, keeping a short prefix.
pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_charge_amount_bounds() {
        let limit = Amount::from(10_000);
        assert_eq!(
            check_charge_amount(Amount::ZERO, limit, "Stripe"),
            Err(PaymentError::InvalidAmount)
        );
        assert_eq!(
            check_charge_amount(Amount::from(-1), limit, "Stripe"),
            Err(PaymentError::InvalidAmount)
        );
        assert!(check_charge_amount(limit, limit, "Stripe").is_ok());
        assert!(matches!(
            check_charge_amount(Amount::from(10_001), limit, "Stripe"),
            Err(PaymentError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn test_redact_keeps_prefix_only() {
        assert_eq!(redact("sk_test_abcdef"), "sk_t****");
        assert_eq!(redact("ab"), "ab****");
    }
}
