//! Domain events emitted after a committed ledger mutation.

use super::account::{Account, AccountId};
use super::hold::Hold;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "account.created")]
    AccountCreated,
    #[serde(rename = "balance.updated")]
    BalanceUpdated,
    #[serde(rename = "account.frozen")]
    AccountFrozen,
    #[serde(rename = "account.unfrozen")]
    AccountUnfrozen,
    #[serde(rename = "account.closed")]
    AccountClosed,
    #[serde(rename = "hold.created")]
    HoldCreated,
    #[serde(rename = "hold.released")]
    HoldReleased,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountCreated => "account.created",
            Self::BalanceUpdated => "balance.updated",
            Self::AccountFrozen => "account.frozen",
            Self::AccountUnfrozen => "account.unfrozen",
            Self::AccountClosed => "account.closed",
            Self::HoldCreated => "hold.created",
            Self::HoldReleased => "hold.released",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub account_id: AccountId,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl AccountEvent {
    pub fn new(event_type: EventType, account_id: AccountId, payload: Value) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type,
            account_id,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn account_created(account: &Account) -> Self {
        Self::new(
            EventType::AccountCreated,
            account.id,
            json!({
                "customer_id": account.customer_id,
                "account_number": account.account_number,
                "account_type": account.account_type,
                "currency": account.currency,
            }),
        )
    }

    /// Carries the balances as read back after the mutation committed.
    pub fn balance_updated(account: &Account) -> Self {
        Self::new(
            EventType::BalanceUpdated,
            account.id,
            json!({
                "balance": account.balance.value().to_string(),
                "available_balance": account.available_balance.value().to_string(),
            }),
        )
    }

    pub fn status_changed(event_type: EventType, account: &Account) -> Self {
        Self::new(
            event_type,
            account.id,
            json!({
                "status": account.status,
                "closed_at": account.closed_at,
            }),
        )
    }

    pub fn hold_created(hold: &Hold) -> Self {
        Self::new(
            EventType::HoldCreated,
            hold.account_id,
            json!({
                "hold_id": hold.id,
                "amount": hold.amount.value().to_string(),
                "reason": hold.reason,
                "transaction_ref": hold.transaction_ref,
            }),
        )
    }

    pub fn hold_released(hold: &Hold) -> Self {
        Self::new(
            EventType::HoldReleased,
            hold.account_id,
            json!({
                "hold_id": hold.id,
                "amount": hold.amount.value().to_string(),
                "released_at": hold.released_at,
            }),
        )
    }
}
