//! Runtime configuration for the ledger.
//!
//! Values come from an optional TOML file; anything missing falls back to the
//! defaults below. The binary applies command line overrides on top.

use crate::domain::account::{AccountType, validate_currency};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default interest rate per account type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterestDefaults {
    pub checking: Decimal,
    pub savings: Decimal,
}

impl Default for InterestDefaults {
    fn default() -> Self {
        Self {
            checking: Decimal::ZERO,
            savings: dec!(0.01),
        }
    }
}

impl InterestDefaults {
    pub fn rate_for(&self, account_type: AccountType) -> Decimal {
        match account_type {
            AccountType::Checking => self.checking,
            AccountType::Savings => self.savings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub default_currency: String,
    pub interest: InterestDefaults,
    /// Deadline for each store call. Only stores that yield while waiting
    /// (the in-memory store) can be cut short by it.
    pub storage_timeout_ms: u64,
    pub account_number_attempts: u32,
    pub event_queue_capacity: usize,
    /// Row-lock wait bound for the RocksDB store, which never yields and so
    /// ignores `storage_timeout_ms`.
    pub lock_timeout_ms: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: "NGN".to_string(),
            interest: InterestDefaults::default(),
            storage_timeout_ms: 5_000,
            account_number_attempts: 5,
            event_queue_capacity: 1_024,
            lock_timeout_ms: 1_000,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        validate_currency(&self.default_currency)
            .map_err(|e| LedgerError::Config(e.to_string()))?;
        if self.interest.checking < Decimal::ZERO || self.interest.savings < Decimal::ZERO {
            return Err(LedgerError::Config(
                "default interest rates must not be negative".to_string(),
            ));
        }
        if self.storage_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "storage_timeout_ms must be positive".to_string(),
            ));
        }
        if self.account_number_attempts == 0 {
            return Err(LedgerError::Config(
                "account_number_attempts must be at least 1".to_string(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(LedgerError::Config(
                "event_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
