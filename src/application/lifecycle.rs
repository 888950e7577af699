use super::{Committed, within};
use crate::config::{InterestDefaults, LedgerConfig};
use crate::domain::account::{
    Account, AccountId, AccountStatus, AccountType, CustomerId, LifecycleAction,
    validate_currency,
};
use crate::domain::events::{AccountEvent, EventType};
use crate::domain::ports::{AccountNumberGeneratorBox, LedgerStoreHandle};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;

/// Parameters for opening an account.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAccount {
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    /// Falls back to the configured default currency.
    pub currency: Option<String>,
    /// Overrides the per-type default interest rate.
    pub interest_rate: Option<Decimal>,
}

impl OpenAccount {
    pub fn new(customer_id: CustomerId, account_type: AccountType) -> Self {
        Self {
            customer_id,
            account_type,
            currency: None,
            interest_rate: None,
        }
    }
}

/// Administrative update of status and/or interest rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUpdate {
    pub status: Option<AccountStatus>,
    pub interest_rate: Option<Decimal>,
}

/// Creates accounts and drives the `ACTIVE <-> FROZEN -> CLOSED` state machine.
pub struct AccountLifecycle {
    store: LedgerStoreHandle,
    numbers: AccountNumberGeneratorBox,
    deadline: Duration,
    default_currency: String,
    interest: InterestDefaults,
    number_attempts: u32,
}

fn non_negative_rate(rate: Decimal) -> Result<Decimal> {
    if rate < Decimal::ZERO {
        Err(LedgerError::invalid(format!(
            "interest rate must not be negative, got {}",
            rate
        )))
    } else {
        Ok(rate)
    }
}

impl AccountLifecycle {
    pub fn new(
        store: LedgerStoreHandle,
        numbers: AccountNumberGeneratorBox,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            store,
            numbers,
            deadline: config.storage_timeout(),
            default_currency: config.default_currency.clone(),
            interest: config.interest.clone(),
            number_attempts: config.account_number_attempts,
        }
    }

    /// Opens an `ACTIVE` account with zero balances.
    ///
    /// A fresh account number is drawn for each attempt; the store's unique
    /// index turns a collision into `AlreadyExists`, which triggers another
    /// draw until the configured number of attempts is used up.
    pub async fn create(&self, request: OpenAccount) -> Result<Committed<Account>> {
        let currency = match request.currency {
            Some(code) => validate_currency(&code)?,
            None => self.default_currency.clone(),
        };
        let interest_rate = match request.interest_rate {
            Some(rate) => non_negative_rate(rate)?,
            None => self.interest.rate_for(request.account_type),
        };

        for attempt in 1..=self.number_attempts {
            let number = self.numbers.generate()?;
            let account = Account::open(
                request.customer_id,
                request.account_type,
                currency.clone(),
                number,
                interest_rate,
                Utc::now(),
            );

            match within(self.deadline, self.store.create_account(account.clone())).await {
                Ok(()) => {
                    tracing::info!(
                        account_id = %account.id,
                        account_number = %account.account_number,
                        account_type = %account.account_type,
                        "account created"
                    );
                    let event = AccountEvent::account_created(&account);
                    return Ok(Committed::with_event(account, event));
                }
                Err(LedgerError::AlreadyExists(what)) => {
                    tracing::debug!(attempt, %what, "account number taken, drawing another");
                }
                Err(err) => return Err(err),
            }
        }

        Err(LedgerError::AlreadyExists(format!(
            "no free account number after {} attempts",
            self.number_attempts
        )))
    }

    pub async fn freeze(&self, id: AccountId) -> Result<Committed<Account>> {
        self.transition(id, LifecycleAction::Freeze).await
    }

    pub async fn unfreeze(&self, id: AccountId) -> Result<Committed<Account>> {
        self.transition(id, LifecycleAction::Unfreeze).await
    }

    /// Closes an account whose balance is exactly zero. The guard is checked
    /// by the store under the row lock.
    pub async fn close(&self, id: AccountId) -> Result<Committed<Account>> {
        self.transition(id, LifecycleAction::Close).await
    }

    /// Last-write-wins update of status and interest rate.
    ///
    /// Closing goes through the zero-balance guard and cannot be combined with
    /// a rate change; closed accounts accept no updates.
    pub async fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Committed<Account>> {
        if let Some(rate) = update.interest_rate {
            non_negative_rate(rate)?;
        }
        if update.status == Some(AccountStatus::Closed) {
            if update.interest_rate.is_some() {
                return Err(LedgerError::invalid(
                    "closing an account cannot be combined with a rate change",
                ));
            }
            return self.close(id).await;
        }

        let account = within(
            self.deadline,
            self.store
                .update_status_and_rate(id, update.status, update.interest_rate),
        )
        .await?;
        Ok(Committed::silent(account))
    }

    async fn transition(&self, id: AccountId, action: LifecycleAction) -> Result<Committed<Account>> {
        let account = within(self.deadline, self.store.change_status(id, action, Utc::now())).await?;
        tracing::info!(account_id = %id, ?action, status = %account.status, "account status changed");

        let event_type = match action {
            LifecycleAction::Freeze => EventType::AccountFrozen,
            LifecycleAction::Unfreeze => EventType::AccountUnfrozen,
            LifecycleAction::Close => EventType::AccountClosed,
        };
        let event = AccountEvent::status_changed(event_type, &account);
        Ok(Committed::with_event(account, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountNumber;
    use crate::domain::hold::{Hold, HoldId};
    use crate::domain::ports::{AccountNumberGenerator, LedgerStore};
    use crate::infrastructure::account_number::RandomAccountNumberGenerator;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use async_trait::async_trait;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Hands out a fixed sequence of numbers.
    struct ScriptedNumbers(Mutex<Vec<&'static str>>);

    impl AccountNumberGenerator for ScriptedNumbers {
        fn generate(&self) -> Result<AccountNumber> {
            let mut numbers = self.0.lock().unwrap();
            AccountNumber::parse(numbers.remove(0))
        }
    }

    fn lifecycle_with(
        store: Arc<InMemoryLedgerStore>,
        numbers: AccountNumberGeneratorBox,
    ) -> AccountLifecycle {
        AccountLifecycle::new(store, numbers, &LedgerConfig::default())
    }

    fn lifecycle() -> (Arc<InMemoryLedgerStore>, AccountLifecycle) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let lifecycle = lifecycle_with(store.clone(), Box::new(RandomAccountNumberGenerator));
        (store, lifecycle)
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (_store, lifecycle) = lifecycle();
        let customer = CustomerId::new();

        let savings = lifecycle
            .create(OpenAccount::new(customer, AccountType::Savings))
            .await
            .unwrap();
        assert_eq!(savings.value.status, AccountStatus::Active);
        assert_eq!(savings.value.interest_rate, dec!(0.01));
        assert_eq!(savings.value.currency, "NGN");
        assert_eq!(savings.event.unwrap().event_type, EventType::AccountCreated);

        let checking = lifecycle
            .create(OpenAccount {
                currency: Some("USD".to_string()),
                ..OpenAccount::new(customer, AccountType::Checking)
            })
            .await
            .unwrap();
        assert_eq!(checking.value.interest_rate, Decimal::ZERO);
        assert_eq!(checking.value.currency, "USD");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (_store, lifecycle) = lifecycle();
        let negative_rate = OpenAccount {
            interest_rate: Some(dec!(-0.5)),
            ..OpenAccount::new(CustomerId::new(), AccountType::Savings)
        };
        assert!(matches!(
            lifecycle.create(negative_rate).await,
            Err(LedgerError::InvalidArgument(_))
        ));

        let bad_currency = OpenAccount {
            currency: Some("naira".to_string()),
            ..OpenAccount::new(CustomerId::new(), AccountType::Savings)
        };
        assert!(matches!(
            lifecycle.create(bad_currency).await,
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_create_retries_on_number_collision() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let numbers = ScriptedNumbers(Mutex::new(vec![
            "00-0000-0001",
            "00-0000-0001",
            "00-0000-0002",
        ]));
        let lifecycle = lifecycle_with(store, Box::new(numbers));

        let first = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Checking))
            .await
            .unwrap();
        let second = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Checking))
            .await
            .unwrap();
        assert_eq!(first.value.account_number.as_str(), "00-0000-0001");
        assert_eq!(second.value.account_number.as_str(), "00-0000-0002");
    }

    #[tokio::test]
    async fn test_create_gives_up_after_attempts() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let numbers = ScriptedNumbers(Mutex::new(vec!["00-0000-0009"; 6]));
        let lifecycle = lifecycle_with(store, Box::new(numbers));

        lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Checking))
            .await
            .unwrap();
        let result = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Checking))
            .await;
        assert!(matches!(result, Err(LedgerError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_freeze_unfreeze_close() {
        let (store, lifecycle) = lifecycle();
        let account = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Checking))
            .await
            .unwrap()
            .value;

        let frozen = lifecycle.freeze(account.id).await.unwrap();
        assert_eq!(frozen.value.status, AccountStatus::Frozen);
        assert_eq!(frozen.event.unwrap().event_type, EventType::AccountFrozen);
        assert!(matches!(
            lifecycle.freeze(account.id).await,
            Err(LedgerError::AlreadyFrozen(_))
        ));

        let active = lifecycle.unfreeze(account.id).await.unwrap();
        assert_eq!(active.value.status, AccountStatus::Active);
        assert!(matches!(
            lifecycle.unfreeze(account.id).await,
            Err(LedgerError::NotFrozen(_))
        ));

        let closed = lifecycle.close(account.id).await.unwrap();
        assert_eq!(closed.value.status, AccountStatus::Closed);
        assert_eq!(closed.event.unwrap().event_type, EventType::AccountClosed);
        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.status, AccountStatus::Closed);
        assert_eq!(stored.closed_at, closed.value.closed_at);

        assert!(matches!(
            lifecycle.close(account.id).await,
            Err(LedgerError::AlreadyClosed(_))
        ));
        assert!(matches!(
            lifecycle.freeze(account.id).await,
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_close_frozen_account_with_balance() {
        let (store, lifecycle) = lifecycle();
        let account = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Checking))
            .await
            .unwrap()
            .value;
        store
            .apply_balance_delta(account.id, dec!(0.01))
            .await
            .unwrap();
        lifecycle.freeze(account.id).await.unwrap();

        assert!(matches!(
            lifecycle.close(account.id).await,
            Err(LedgerError::NonZeroBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_status_and_rate() {
        let (store, lifecycle) = lifecycle();
        let account = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Savings))
            .await
            .unwrap()
            .value;

        let updated = lifecycle
            .update(
                account.id,
                AccountUpdate {
                    status: None,
                    interest_rate: Some(dec!(0.035)),
                },
            )
            .await
            .unwrap();
        assert!(updated.event.is_none());
        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.interest_rate, dec!(0.035));
        assert_eq!(stored.status, AccountStatus::Active);

        assert!(matches!(
            lifecycle
                .update(
                    account.id,
                    AccountUpdate {
                        status: Some(AccountStatus::Closed),
                        interest_rate: Some(dec!(0.01)),
                    },
                )
                .await,
            Err(LedgerError::InvalidArgument(_))
        ));

        let closed = lifecycle
            .update(
                account.id,
                AccountUpdate {
                    status: Some(AccountStatus::Closed),
                    interest_rate: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.value.status, AccountStatus::Closed);

        assert!(matches!(
            lifecycle
                .update(account.id, AccountUpdate::default())
                .await,
            Err(LedgerError::InvalidState(_))
        ));
    }

    /// Parks every freeze until `gate` is notified, so other writes can
    /// commit while the freeze is in flight.
    struct DelayedFreezes {
        inner: InMemoryLedgerStore,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl LedgerStore for DelayedFreezes {
        async fn create_account(&self, account: Account) -> Result<()> {
            self.inner.create_account(account).await
        }

        async fn get_account_by_id(&self, id: AccountId) -> Result<Account> {
            self.inner.get_account_by_id(id).await
        }

        async fn get_account_by_number(&self, number: &AccountNumber) -> Result<Account> {
            self.inner.get_account_by_number(number).await
        }

        async fn get_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
            self.inner.get_accounts_by_customer(customer_id).await
        }

        async fn update_status_and_rate(
            &self,
            id: AccountId,
            status: Option<AccountStatus>,
            interest_rate: Option<Decimal>,
        ) -> Result<Account> {
            self.inner.update_status_and_rate(id, status, interest_rate).await
        }

        async fn change_status(
            &self,
            id: AccountId,
            action: LifecycleAction,
            at: DateTime<Utc>,
        ) -> Result<Account> {
            if action == LifecycleAction::Freeze {
                self.gate.notified().await;
            }
            self.inner.change_status(id, action, at).await
        }

        async fn apply_balance_delta(&self, id: AccountId, delta: Decimal) -> Result<()> {
            self.inner.apply_balance_delta(id, delta).await
        }

        async fn create_hold(&self, hold: Hold) -> Result<()> {
            self.inner.create_hold(hold).await
        }

        async fn release_hold(&self, hold_id: HoldId, released_at: DateTime<Utc>) -> Result<Hold> {
            self.inner.release_hold(hold_id, released_at).await
        }

        async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
            self.inner.get_hold(hold_id).await
        }

        async fn active_holds(&self, account_id: AccountId) -> Result<Vec<Hold>> {
            self.inner.active_holds(account_id).await
        }
    }

    #[tokio::test]
    async fn test_close_wins_over_in_flight_freeze() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(DelayedFreezes {
            inner: InMemoryLedgerStore::new(),
            gate: gate.clone(),
        });
        let lifecycle = Arc::new(AccountLifecycle::new(
            store.clone(),
            Box::new(RandomAccountNumberGenerator),
            &LedgerConfig::default(),
        ));
        let account = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Savings))
            .await
            .unwrap()
            .value;
        lifecycle
            .update(
                account.id,
                AccountUpdate {
                    status: None,
                    interest_rate: Some(dec!(0.07)),
                },
            )
            .await
            .unwrap();

        let freeze = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.freeze(account.id).await })
        };
        tokio::task::yield_now().await;

        let closed = lifecycle.close(account.id).await.unwrap().value;
        gate.notify_one();

        assert!(matches!(
            freeze.await.unwrap(),
            Err(LedgerError::InvalidState(_))
        ));
        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.status, AccountStatus::Closed);
        assert_eq!(stored.closed_at, closed.closed_at);
        assert_eq!(stored.interest_rate, dec!(0.07));
    }

    #[tokio::test]
    async fn test_freeze_keeps_concurrent_rate_change() {
        let (store, lifecycle) = lifecycle();
        let account = lifecycle
            .create(OpenAccount::new(CustomerId::new(), AccountType::Savings))
            .await
            .unwrap()
            .value;

        store
            .update_status_and_rate(account.id, None, Some(dec!(0.09)))
            .await
            .unwrap();
        let frozen = lifecycle.freeze(account.id).await.unwrap().value;
        assert_eq!(frozen.status, AccountStatus::Frozen);
        assert_eq!(frozen.interest_rate, dec!(0.09));
        assert_eq!(
            store.get_account_by_id(account.id).await.unwrap().interest_rate,
            dec!(0.09)
        );
    }
}
