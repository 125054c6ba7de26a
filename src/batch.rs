//! CSV batch driver.
//!
//! Reads `charge` and `refund` rows, runs them through a [`PaymentProcessor`]
//! in input order, and writes one result row per processed input row.
//!
//! ```text
//! type,payment,customer,email,risk,amount,currency,method,country
//! charge,pay_1,cust_1,a@example.com,0.1,100.00,USD,pm_card,DE
//! refund,pay_1,,,,40,,,
//! ```

use crate::error::{BatchError, Result};
use crate::money::Amount;
use crate::processor::PaymentProcessor;
use crate::types::{Customer, PaymentRequest, PaymentResult};
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::str::FromStr;

const REFUND_REASON: &str = "batch refund";

/// Raw row as read from CSV. Only `type` and `payment` are always required.
#[derive(Debug, Deserialize)]
pub struct BatchRecord {
    /// `charge` or `refund`
    #[serde(rename = "type")]
    pub op_type: String,

    /// Payment id for charges; the charge being refunded for refunds
    pub payment: String,

    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A parsed batch operation.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Charge {
        request: PaymentRequest,
        customer: Customer,
    },
    Refund {
        payment: String,
        amount: Amount,
    },
}

impl BatchRecord {
    /// Parses the raw row into an operation.
    ///
    /// `row` is only used to label the error for unknown types and
    /// missing/malformed required fields.
    pub fn parse(&self, row: usize) -> Result<BatchOp> {
        let invalid = |message: String| BatchError::InvalidRecord { row, message };
        let payment = required(Some(&self.payment), "payment", row)?;

        match self.op_type.trim().to_lowercase().as_str() {
            "charge" => {
                let customer_id = required(self.customer.as_ref(), "customer", row)?;
                let email = required(self.email.as_ref(), "email", row)?;
                let risk_raw = required(self.risk.as_ref(), "risk", row)?;
                let risk = f64::from_str(risk_raw)
                    .map_err(|_| invalid(format!("invalid risk '{}'", risk_raw)))?;
                let amount = self.parse_amount(row)?;
                let currency = required(self.currency.as_ref(), "currency", row)?;
                let method = non_empty(self.method.as_ref()).unwrap_or_default();

                let mut request =
                    PaymentRequest::new(payment, amount, currency, customer_id, method);
                if let Some(country) = non_empty(self.country.as_ref()) {
                    request = request.with_metadata("country", country);
                }

                Ok(BatchOp::Charge {
                    request,
                    customer: Customer::new(customer_id, email, customer_id, risk),
                })
            }
            "refund" => Ok(BatchOp::Refund {
                payment: payment.to_string(),
                amount: self.parse_amount(row)?,
            }),
            other => Err(invalid(format!("unknown type '{}'", other))),
        }
    }

    fn parse_amount(&self, row: usize) -> Result<Amount> {
        let raw = required(self.amount.as_ref(), "amount", row)?;
        Amount::from_str(raw).map_err(|_| BatchError::InvalidRecord {
            row,
            message: format!("invalid amount '{}'", raw),
        })
    }
}

fn non_empty(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn required<'a>(field: Option<&'a String>, name: &str, row: usize) -> Result<&'a str> {
    non_empty(field).ok_or_else(|| BatchError::InvalidRecord {
        row,
        message: format!("missing {}", name),
    })
}

/// Result row for one processed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub payment: String,
    pub op: &'static str,
    pub success: bool,
    pub transaction_id: Option<String>,
    pub error: Option<String>,
}

impl BatchOutcome {
    fn from_result(payment: &str, op: &'static str, result: &PaymentResult) -> Self {
        BatchOutcome {
            payment: payment.to_string(),
            op,
            success: result.is_success(),
            transaction_id: result.transaction_id().map(ToString::to_string),
            error: result.error_message(),
        }
    }
}

/// Runs batch operations against a single processor.
pub struct BatchRunner {
    processor: PaymentProcessor,

    /// Payment id → gateway transaction id for successful charges.
    charges: HashMap<String, String>,

    /// Every payment id a charge was attempted for, whatever the outcome.
    seen: HashSet<String>,

    outcomes: Vec<BatchOutcome>,
}

impl BatchRunner {
    pub fn new(processor: PaymentProcessor) -> Self {
        BatchRunner {
            processor,
            charges: HashMap::new(),
            seen: HashSet::new(),
            outcomes: Vec::new(),
        }
    }

    /// Processes operations from a CSV reader one row at a time.
    ///
    /// Invalid rows are logged at warn level and skipped.
    pub async fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<BatchRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse(row_num) {
                    Ok(op) => self.apply(op, row_num).await,
                    Err(e) => warn!("{}", e),
                },
                Err(e) => warn!("Row {}: CSV parse error: {}", row_num, e),
            }
        }

        Ok(())
    }

    /// Runs a single operation and records its outcome.
    pub async fn apply(&mut self, op: BatchOp, row: usize) {
        match op {
            BatchOp::Charge { request, customer } => {
                if !self.seen.insert(request.id.clone()) {
                    warn!("Row {}: Duplicate payment {}, ignoring", row, request.id);
                    return;
                }

                let result = self.processor.process_payment(&request, &customer).await;
                if let Some(tx) = result.transaction_id() {
                    self.charges.insert(request.id.clone(), tx.to_string());
                }
                debug!("Row {}: Charge {} success={}", row, request.id, result.is_success());
                self.outcomes
                    .push(BatchOutcome::from_result(&request.id, "charge", &result));
            }
            BatchOp::Refund { payment, amount } => {
                // Unknown payment ids are passed through as raw transaction ids
                let transaction_id = self
                    .charges
                    .get(&payment)
                    .cloned()
                    .unwrap_or_else(|| payment.clone());

                let result = self
                    .processor
                    .refund_payment(&transaction_id, amount, REFUND_REASON)
                    .await;
                debug!("Row {}: Refund {} success={}", row, payment, result.is_success());
                self.outcomes
                    .push(BatchOutcome::from_result(&payment, "refund", &result));
            }
        }
    }

    /// Gives queued notifications their reprocessing pass.
    pub async fn flush_notifications(&mut self) -> usize {
        let notifications = self.processor.notifications_mut();
        if notifications.queued().is_empty() {
            return 0;
        }
        let delivered = notifications.process_queue().await;
        info!("Redelivered {} queued notifications", delivered);
        delivered
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    pub fn processor(&self) -> &PaymentProcessor {
        &self.processor
    }

    /// Writes one result row per processed operation, in input order.
    pub fn write_output<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["payment", "type", "success", "transaction_id", "error"])?;

        for outcome in &self.outcomes {
            csv_writer.write_record([
                outcome.payment.as_str(),
                outcome.op,
                if outcome.success { "true" } else { "false" },
                outcome.transaction_id.as_deref().unwrap_or(""),
                outcome.error.as_deref().unwrap_or(""),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
