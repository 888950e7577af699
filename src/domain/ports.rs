use super::account::{
    Account, AccountId, AccountNumber, AccountStatus, CustomerId, LifecycleAction,
};
use super::events::AccountEvent;
use super::hold::{Hold, HoldId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Durable storage of account and hold rows.
///
/// This is the only component that touches persistent state and the only place
/// where concurrency control lives. Every mutating method is all-or-nothing:
/// when it returns an error, or when its future is dropped before completion,
/// no partial effect is observable.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a new account row. Fails with `AlreadyExists` when the account
    /// number is taken.
    async fn create_account(&self, account: Account) -> Result<()>;

    async fn get_account_by_id(&self, id: AccountId) -> Result<Account>;

    async fn get_account_by_number(&self, number: &AccountNumber) -> Result<Account>;

    /// All accounts of a customer, newest first. Empty when the customer has none.
    async fn get_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>>;

    /// Last-write-wins update of status and/or interest rate, evaluated on the
    /// locked row. Fails with `InvalidState` when the stored account is
    /// `CLOSED`. Returns the updated row.
    async fn update_status_and_rate(
        &self,
        id: AccountId,
        status: Option<AccountStatus>,
        interest_rate: Option<Decimal>,
    ) -> Result<Account>;

    /// Applies a freeze, unfreeze or close to the locked row, checking the
    /// transition (and for close the zero-balance guard) against the stored
    /// status. Returns the updated row.
    async fn change_status(
        &self,
        id: AccountId,
        action: LifecycleAction,
        at: DateTime<Utc>,
    ) -> Result<Account>;

    /// Atomically adds `delta` to both balances when `balance + delta >= 0`.
    ///
    /// Fails with `InsufficientFunds` if the guard rejects the update and with
    /// `AccountNotFound` if the row does not exist.
    async fn apply_balance_delta(&self, id: AccountId, delta: Decimal) -> Result<()>;

    /// Inserts the hold and reserves its amount while holding the account row
    /// exclusively. Hold creations on one account are serialized.
    async fn create_hold(&self, hold: Hold) -> Result<()>;

    /// Stamps `released_at` on an active hold and restores its amount to the
    /// owning account's available balance.
    async fn release_hold(&self, hold_id: HoldId, released_at: DateTime<Utc>) -> Result<Hold>;

    async fn get_hold(&self, hold_id: HoldId) -> Result<Hold>;

    /// Holds on an account whose `released_at` is unset, newest first.
    async fn active_holds(&self, account_id: AccountId) -> Result<Vec<Hold>>;
}

/// Outbound sink for domain events. Delivery is at-most-once from the ledger's
/// point of view: failures are logged by the caller, never retried.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &AccountEvent) -> Result<()>;
}

/// Source of fresh account numbers. Uniqueness is enforced by the store;
/// collisions are retried by the caller.
pub trait AccountNumberGenerator: Send + Sync {
    fn generate(&self) -> Result<AccountNumber>;
}

pub type LedgerStoreHandle = Arc<dyn LedgerStore>;
pub type EventPublisherBox = Box<dyn EventPublisher>;
pub type AccountNumberGeneratorBox = Box<dyn AccountNumberGenerator>;
