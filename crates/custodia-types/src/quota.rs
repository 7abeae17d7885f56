//! Quota and budget types
//!
//! Money is carried in integer minor units (cents) with an ISO currency
//! code. Mixed-currency arithmetic is an error; the quota gate treats it as
//! a reason to fail closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default currency for workspaces
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Money in integer minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (e.g. cents)
    pub amount_minor: i64,

    /// ISO 4217 currency code
    pub currency: [u8; 3],
}

/// Errors from money arithmetic
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Operands carry different currencies
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// Addition overflowed the minor-unit range
    #[error("Amount overflow")]
    Overflow,
}

impl Money {
    /// Create an amount in minor units of the given currency
    pub fn new(amount_minor: i64, currency: &str) -> Self {
        let mut code = [b'E', b'U', b'R'];
        let bytes = currency.as_bytes();
        if bytes.len() == 3 {
            code.copy_from_slice(&bytes[..3]);
        }
        Self {
            amount_minor,
            currency: code,
        }
    }

    /// Create a EUR amount in minor units
    pub fn eur(amount_minor: i64) -> Self {
        Self::new(amount_minor, DEFAULT_CURRENCY)
    }

    /// Zero in the default currency
    pub fn zero() -> Self {
        Self::eur(0)
    }

    /// The ISO currency code
    pub fn currency_code(&self) -> &str {
        std::str::from_utf8(&self.currency).unwrap_or(DEFAULT_CURRENCY)
    }

    /// Checked addition; errors on currency mismatch or overflow
    pub fn checked_add(&self, other: Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency_code().to_string(),
                right: other.currency_code().to_string(),
            });
        }
        let amount = self
            .amount_minor
            .checked_add(other.amount_minor)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money {
            amount_minor: amount,
            currency: self.currency,
        })
    }

    /// Saturating subtraction within one currency; clamps at zero
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money {
            amount_minor: self.amount_minor.saturating_sub(other.amount_minor).max(0),
            currency: self.currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount_minor / 100,
            (self.amount_minor % 100).abs(),
            self.currency_code()
        )
    }
}

/// Budget accounting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetWindow {
    Daily,
    Monthly,
    /// No rolling window; the budget is a hard lifetime cap
    Lifetime,
}

/// Result of a quota check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDecision {
    /// Budget left after the estimated cost; `None` when unbounded
    pub remaining: Option<Money>,

    /// Configured budget limit; `None` when no budget is configured
    pub budget_limit: Option<Money>,

    /// Accounting window of the budget
    pub window: BudgetWindow,

    /// Whether the estimated cost would exceed the budget
    pub exceeded: bool,

    /// When the window resets, if known
    pub reset_at: Option<DateTime<Utc>>,
}

impl QuotaDecision {
    /// Decision for a workspace with no configured budget
    pub fn unbounded() -> Self {
        Self {
            remaining: None,
            budget_limit: None,
            window: BudgetWindow::Monthly,
            exceeded: false,
            reset_at: None,
        }
    }
}
