use super::{Committed, within};
use crate::domain::account::{AccountId, Amount};
use crate::domain::events::AccountEvent;
use crate::domain::hold::{Hold, HoldId};
use crate::domain::ports::LedgerStoreHandle;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// A request to reserve funds on an account.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldRequest {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub reason: String,
    pub transaction_ref: Option<String>,
    /// Stored for an external sweeper; holds never expire on their own here.
    pub expires_at: Option<DateTime<Utc>>,
}

impl HoldRequest {
    pub fn new(account_id: AccountId, amount: Decimal, reason: impl Into<String>) -> Self {
        Self {
            account_id,
            amount,
            reason: reason.into(),
            transaction_ref: None,
            expires_at: None,
        }
    }

    pub fn with_transaction_ref(mut self, transaction_ref: impl Into<String>) -> Self {
        self.transaction_ref = Some(transaction_ref.into());
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Funds reservation lifecycle: create and release holds.
#[derive(Clone)]
pub struct HoldManager {
    store: LedgerStoreHandle,
    deadline: Duration,
}

impl HoldManager {
    pub fn new(store: LedgerStoreHandle, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Reserves funds on an `ACTIVE` account.
    ///
    /// The status check runs before the store transaction; the sufficiency
    /// check runs inside it under the account row lock.
    pub async fn create_hold(&self, request: HoldRequest) -> Result<Committed<Hold>> {
        let amount = Amount::new(request.amount)?;
        if request.reason.trim().is_empty() {
            return Err(LedgerError::invalid("hold reason must not be empty"));
        }
        let now = Utc::now();
        if request.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(LedgerError::invalid("hold expiry must be in the future"));
        }

        let account = within(
            self.deadline,
            self.store.get_account_by_id(request.account_id),
        )
        .await?;
        account.ensure_active()?;

        let hold = Hold::new(
            request.account_id,
            amount,
            request.reason,
            request.transaction_ref,
            request.expires_at,
            now,
        );
        within(self.deadline, self.store.create_hold(hold.clone())).await?;
        tracing::info!(hold_id = %hold.id, account_id = %hold.account_id, amount = %amount.value(), "hold created");

        let event = AccountEvent::hold_created(&hold);
        Ok(Committed::with_event(hold, event))
    }

    /// Releases an active hold. Not idempotent: a second release of the same
    /// hold fails with `AlreadyReleased`.
    pub async fn release_hold(&self, hold_id: HoldId) -> Result<Committed<Hold>> {
        let hold = within(self.deadline, self.store.release_hold(hold_id, Utc::now())).await?;
        tracing::info!(%hold_id, account_id = %hold.account_id, "hold released");

        let event = AccountEvent::hold_released(&hold);
        Ok(Committed::with_event(hold, event))
    }

    pub async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
        within(self.deadline, self.store.get_hold(hold_id)).await
    }

    pub async fn active_holds(&self, account_id: AccountId) -> Result<Vec<Hold>> {
        within(self.deadline, self.store.get_account_by_id(account_id)).await?;
        within(self.deadline, self.store.active_holds(account_id)).await
    }
}
