//! Credit ledger
//!
//! Credits gate content creation. Debits are all-or-nothing: the balance is
//! never driven below zero.

use serde::{Deserialize, Serialize};

use crate::error::{CuratorError, CuratorResult};

/// Balance every new (or reset) account starts with.
pub const INITIAL_CREDITS: f64 = 100.0;

/// Credits consumed by one create or promote.
pub const CONTENT_COST: f64 = 1.0;

/// Running credit balance. Serializes as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    balance: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(INITIAL_CREDITS)
    }
}

impl Ledger {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: balance.max(0.0),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Check that `amount` could be debited without touching the balance.
    pub fn ensure_available(&self, amount: f64) -> CuratorResult<()> {
        if amount > self.balance {
            return Err(CuratorError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        Ok(())
    }

    /// Add credits, e.g. a monthly allocation.
    pub fn credit(&mut self, amount: f64) -> CuratorResult<f64> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(CuratorError::InvalidAmount(amount));
        }
        self.balance += amount;
        Ok(self.balance)
    }

    /// Spend credits. Fails without side effects when the balance is short.
    pub fn debit(&mut self, amount: f64) -> CuratorResult<f64> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(CuratorError::InvalidAmount(amount));
        }
        self.ensure_available(amount)?;
        self.balance -= amount;
        Ok(self.balance)
    }

    pub fn reset(&mut self) {
        self.balance = INITIAL_CREDITS;
    }
}
