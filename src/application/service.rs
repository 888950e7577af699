use super::holds::{HoldManager, HoldRequest};
use super::lifecycle::{AccountLifecycle, AccountUpdate, OpenAccount};
use super::mutator::BalanceMutator;
use super::outbox::EventOutbox;
use super::{Committed, within};
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountId, AccountNumber, BalanceSnapshot, CustomerId};
use crate::domain::events::AccountEvent;
use crate::domain::hold::{Hold, HoldId};
use crate::domain::ports::{AccountNumberGeneratorBox, LedgerStoreHandle};
use crate::error::Result;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

/// The entry point transport layers call into.
///
/// `LedgerService` owns the core components and the outbound event queue.
/// Each public method maps to one ledger operation; every successful mutation
/// queues the event it produced before returning. Queuing never fails the
/// operation.
pub struct LedgerService {
    store: LedgerStoreHandle,
    deadline: Duration,
    lifecycle: AccountLifecycle,
    mutator: BalanceMutator,
    holds: HoldManager,
    outbox: EventOutbox,
}

impl LedgerService {
    /// Creates a new `LedgerService`.
    ///
    /// Returns the receiving half of the event queue alongside the service;
    /// hand it to [`spawn_publisher`](super::outbox::spawn_publisher) or drain
    /// it directly.
    pub fn new(
        store: LedgerStoreHandle,
        numbers: AccountNumberGeneratorBox,
        config: &LedgerConfig,
    ) -> (Self, Receiver<AccountEvent>) {
        let deadline = config.storage_timeout();
        let (outbox, events) = EventOutbox::channel(config.event_queue_capacity);
        let service = Self {
            lifecycle: AccountLifecycle::new(store.clone(), numbers, config),
            mutator: BalanceMutator::new(store.clone(), deadline),
            holds: HoldManager::new(store.clone(), deadline),
            store,
            deadline,
            outbox,
        };
        (service, events)
    }

    fn emit<T>(&self, committed: Committed<T>) -> T {
        if let Some(event) = committed.event {
            self.outbox.enqueue(event);
        }
        committed.value
    }

    pub async fn create_account(&self, request: OpenAccount) -> Result<Account> {
        let committed = self.lifecycle.create(request).await?;
        Ok(self.emit(committed))
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        within(self.deadline, self.store.get_account_by_id(id)).await
    }

    /// Looks an account up by its formatted number; a malformed number fails
    /// with `InvalidArgument` without touching storage.
    pub async fn get_account_by_number(&self, number: &str) -> Result<Account> {
        let number = AccountNumber::parse(number)?;
        within(self.deadline, self.store.get_account_by_number(&number)).await
    }

    pub async fn get_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        within(self.deadline, self.store.get_accounts_by_customer(customer_id)).await
    }

    pub async fn update_account(&self, id: AccountId, update: AccountUpdate) -> Result<Account> {
        let committed = self.lifecycle.update(id, update).await?;
        Ok(self.emit(committed))
    }

    pub async fn freeze_account(&self, id: AccountId) -> Result<Account> {
        let committed = self.lifecycle.freeze(id).await?;
        Ok(self.emit(committed))
    }

    pub async fn unfreeze_account(&self, id: AccountId) -> Result<Account> {
        let committed = self.lifecycle.unfreeze(id).await?;
        Ok(self.emit(committed))
    }

    pub async fn close_account(&self, id: AccountId) -> Result<Account> {
        let committed = self.lifecycle.close(id).await?;
        Ok(self.emit(committed))
    }

    pub async fn get_balance(&self, id: AccountId) -> Result<BalanceSnapshot> {
        Ok(self.get_account(id).await?.snapshot())
    }

    pub async fn credit(&self, id: AccountId, amount: Decimal) -> Result<Option<BalanceSnapshot>> {
        let committed = self.mutator.credit(id, amount).await?;
        Ok(self.emit(committed))
    }

    pub async fn debit(&self, id: AccountId, amount: Decimal) -> Result<Option<BalanceSnapshot>> {
        let committed = self.mutator.debit(id, amount).await?;
        Ok(self.emit(committed))
    }

    pub async fn create_hold(&self, request: HoldRequest) -> Result<Hold> {
        let committed = self.holds.create_hold(request).await?;
        Ok(self.emit(committed))
    }

    pub async fn release_hold(&self, hold_id: HoldId) -> Result<Hold> {
        let committed = self.holds.release_hold(hold_id).await?;
        Ok(self.emit(committed))
    }

    pub async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
        self.holds.get_hold(hold_id).await
    }

    pub async fn active_holds(&self, account_id: AccountId) -> Result<Vec<Hold>> {
        self.holds.active_holds(account_id).await
    }

    pub async fn validate_account_ownership(
        &self,
        account_id: AccountId,
        customer_id: CustomerId,
    ) -> Result<bool> {
        Ok(self.get_account(account_id).await?.customer_id == customer_id)
    }
}
