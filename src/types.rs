//! Request, customer and result models shared by gateways and the processor.

use crate::error::PaymentError;
use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request to charge a customer.
///
/// Components only ever borrow a request; nothing in the crate mutates one
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub id: String,
    pub amount: Amount,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl PaymentRequest {
    pub fn new(
        id: impl Into<String>,
        amount: Amount,
        currency: impl Into<String>,
        customer_id: impl Into<String>,
        payment_method_id: impl Into<String>,
    ) -> Self {
        PaymentRequest {
            id: id.into(),
            amount,
            currency: currency.into(),
            customer_id: customer_id.into(),
            payment_method_id: payment_method_id.into(),
            metadata: None,
        }
    }

    /// Adds a metadata entry, creating the map on first use.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key).map(String::as_str)
    }
}

/// The paying customer.
///
/// `risk_score` is a caller-supplied baseline in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub name: String,
    pub risk_score: f64,
}

impl Customer {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        risk_score: f64,
    ) -> Self {
        Customer {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            risk_score,
        }
    }
}

/// Outcome of a gateway or processor operation.
///
/// Built only through the constructors so a result is never half-populated:
/// a successful charge always carries a transaction id, a failure always
/// carries an error.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResult {
    success: bool,
    transaction_id: Option<String>,
    error: Option<PaymentError>,
    gateway_response: Option<serde_json::Value>,
}

impl PaymentResult {
    /// Successful charge with the provider's response blob.
    pub fn charged(transaction_id: impl Into<String>, gateway_response: serde_json::Value) -> Self {
        PaymentResult {
            success: true,
            transaction_id: Some(transaction_id.into()),
            error: None,
            gateway_response: Some(gateway_response),
        }
    }

    /// Successful refund.
    pub fn refunded(refund_id: impl Into<String>) -> Self {
        PaymentResult {
            success: true,
            transaction_id: Some(refund_id.into()),
            error: None,
            gateway_response: None,
        }
    }

    pub fn failed(error: PaymentError) -> Self {
        PaymentResult {
            success: false,
            transaction_id: None,
            error: Some(error),
            gateway_response: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn error(&self) -> Option<&PaymentError> {
        self.error.as_ref()
    }

    /// Human-readable error message, if the operation failed.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn gateway_response(&self) -> Option<&serde_json::Value> {
        self.gateway_response.as_ref()
    }
}
