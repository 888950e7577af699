use crate::domain::account::{AccountId, AccountStatus};
use crate::domain::hold::HoldId;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account {0} not found")]
    AccountNotFound(String),
    #[error("Hold {0} not found")]
    HoldNotFound(HoldId),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Insufficient funds on account {0}")]
    InsufficientFunds(AccountId),
    #[error("Account {account_id} is not active (status: {status})")]
    AccountNotActive {
        account_id: AccountId,
        status: AccountStatus,
    },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Account {0} is already frozen")]
    AlreadyFrozen(AccountId),
    #[error("Account {0} is not frozen")]
    NotFrozen(AccountId),
    #[error("Account {0} is already closed")]
    AlreadyClosed(AccountId),
    #[error("Cannot close account {account_id} with non-zero balance {balance}")]
    NonZeroBalance {
        account_id: AccountId,
        balance: Decimal,
    },
    #[error("Hold {0} was already released")]
    AlreadyReleased(HoldId),
    #[error("Storage operation timed out")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn account_not_found(id: impl ToString) -> Self {
        Self::AccountNotFound(id.to_string())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for both account and hold absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::HoldNotFound(_))
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for LedgerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}
