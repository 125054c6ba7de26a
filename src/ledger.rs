//! In-memory transaction ledger owned by a single gateway instance.
//!
//! Maintains the invariant: a refund never takes `remaining` below zero.

use crate::error::PaymentError;
use crate::money::Amount;
use std::collections::HashMap;

/// Lifecycle state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Charge captured, nothing refunded yet.
    Completed,
    /// At least one refund has been applied.
    Refunded,
}

/// A single charged transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub status: EntryStatus,

    /// Amount still refundable. Starts at the charged amount.
    pub remaining: Amount,
}

impl LedgerEntry {
    pub fn new(amount: Amount) -> Self {
        LedgerEntry {
            status: EntryStatus::Completed,
            remaining: amount,
        }
    }

    /// Applies a refund.
    ///
    /// Returns `false` without touching the entry if `amount` is not positive
    /// or exceeds what remains.
    pub fn refund(&mut self, amount: Amount) -> bool {
        if !amount.is_positive() || amount > self.remaining {
            return false;
        }

        self.remaining -= amount;
        self.status = EntryStatus::Refunded;
        true
    }
}

/// Transaction id → entry map. Entries never expire.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: HashMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed charge under `transaction_id`.
    pub fn record_charge(&mut self, transaction_id: &str, amount: Amount) {
        self.entries
            .insert(transaction_id.to_string(), LedgerEntry::new(amount));
    }

    /// Refunds part or all of a recorded charge.
    ///
    /// On failure the ledger is left untouched.
    pub fn refund(&mut self, transaction_id: &str, amount: Amount) -> Result<Amount, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount);
        }

        let entry = self
            .entries
            .get_mut(transaction_id)
            .ok_or_else(|| PaymentError::NotFound {
                transaction_id: transaction_id.to_string(),
            })?;

        if !entry.refund(amount) {
            return Err(PaymentError::AmountExceedsOriginal {
                requested: amount,
                remaining: entry.remaining,
            });
        }

        Ok(entry.remaining)
    }

    pub fn get(&self, transaction_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(transaction_id)
    }

    pub fn status(&self, transaction_id: &str) -> Option<EntryStatus> {
        self.get(transaction_id).map(|e| e.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
