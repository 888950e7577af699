use crate::domain::account::{
    Account, AccountId, AccountNumber, AccountStatus, CustomerId, LifecycleAction,
};
use crate::domain::events::AccountEvent;
use crate::domain::hold::{Hold, HoldId};
use crate::domain::ports::{EventPublisher, LedgerStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One lockable account row.
type Row = Arc<Mutex<Account>>;

#[derive(Default)]
struct AccountTable {
    rows: HashMap<AccountId, Row>,
    by_number: HashMap<AccountNumber, AccountId>,
}

/// A thread-safe in-memory ledger store.
///
/// Every account row sits behind its own `tokio::sync::Mutex`, which plays the
/// part of a row lock. Locks are always taken in the order
/// account table -> account row -> hold table. All writes of an operation
/// happen after its last `.await`, so dropping the future mid-way leaves no
/// partial effect.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    accounts: Arc<RwLock<AccountTable>>,
    holds: Arc<RwLock<HashMap<HoldId, Hold>>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn row(&self, id: AccountId) -> Result<Row> {
        let accounts = self.accounts.read().await;
        accounts
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::account_not_found(id))
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_account(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.by_number.contains_key(&account.account_number) {
            return Err(LedgerError::AlreadyExists(format!(
                "account number {}",
                account.account_number
            )));
        }
        if accounts.rows.contains_key(&account.id) {
            return Err(LedgerError::AlreadyExists(format!("account {}", account.id)));
        }
        accounts
            .by_number
            .insert(account.account_number.clone(), account.id);
        accounts.rows.insert(account.id, Arc::new(Mutex::new(account)));
        Ok(())
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Account> {
        let row = self.row(id).await?;
        let account = row.lock().await;
        Ok(account.clone())
    }

    async fn get_account_by_number(&self, number: &AccountNumber) -> Result<Account> {
        let id = {
            let accounts = self.accounts.read().await;
            accounts
                .by_number
                .get(number)
                .copied()
                .ok_or_else(|| LedgerError::account_not_found(number))?
        };
        self.get_account_by_id(id).await
    }

    async fn get_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let rows: Vec<Row> = {
            let accounts = self.accounts.read().await;
            accounts.rows.values().cloned().collect()
        };

        let mut owned = Vec::new();
        for row in rows {
            let account = row.lock().await;
            if account.customer_id == customer_id {
                owned.push(account.clone());
            }
        }
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update_status_and_rate(
        &self,
        id: AccountId,
        status: Option<AccountStatus>,
        interest_rate: Option<Decimal>,
    ) -> Result<Account> {
        let row = self.row(id).await?;
        let mut account = row.lock().await;
        account.amend(status, interest_rate, Utc::now())?;
        Ok(account.clone())
    }

    async fn change_status(
        &self,
        id: AccountId,
        action: LifecycleAction,
        at: DateTime<Utc>,
    ) -> Result<Account> {
        let row = self.row(id).await?;
        let mut account = row.lock().await;
        account.apply(action, at)?;
        Ok(account.clone())
    }

    async fn apply_balance_delta(&self, id: AccountId, delta: Decimal) -> Result<()> {
        let row = self.row(id).await?;
        let mut account = row.lock().await;
        account.apply_delta(delta, Utc::now())
    }

    async fn create_hold(&self, hold: Hold) -> Result<()> {
        let row = self.row(hold.account_id).await?;
        let mut account = row.lock().await;
        let mut holds = self.holds.write().await;

        if holds.contains_key(&hold.id) {
            return Err(LedgerError::AlreadyExists(format!("hold {}", hold.id)));
        }
        account.reserve(hold.amount, Utc::now())?;
        holds.insert(hold.id, hold);
        Ok(())
    }

    async fn release_hold(&self, hold_id: HoldId, released_at: DateTime<Utc>) -> Result<Hold> {
        let account_id = {
            let holds = self.holds.read().await;
            holds
                .get(&hold_id)
                .map(|hold| hold.account_id)
                .ok_or(LedgerError::HoldNotFound(hold_id))?
        };

        let row = self.row(account_id).await?;
        let mut account = row.lock().await;
        let mut holds = self.holds.write().await;

        let hold = holds
            .get_mut(&hold_id)
            .ok_or(LedgerError::HoldNotFound(hold_id))?;
        if !hold.is_active() {
            return Err(LedgerError::AlreadyReleased(hold_id));
        }
        account.restore(hold.amount, released_at)?;
        hold.mark_released(released_at);
        Ok(hold.clone())
    }

    async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
        let holds = self.holds.read().await;
        holds
            .get(&hold_id)
            .cloned()
            .ok_or(LedgerError::HoldNotFound(hold_id))
    }

    async fn active_holds(&self, account_id: AccountId) -> Result<Vec<Hold>> {
        let holds = self.holds.read().await;
        let mut active: Vec<Hold> = holds
            .values()
            .filter(|hold| hold.account_id == account_id && hold.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }
}

/// Collects published events in memory.
///
/// Handy for tests and for wiring the ledger without an external bus. Can be
/// told to fail so the swallow-on-error path can be exercised.
#[derive(Default, Clone)]
pub struct InMemoryEventPublisher {
    events: Arc<RwLock<Vec<AccountEvent>>>,
    failing: bool,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher that rejects every event.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn published(&self) -> Vec<AccountEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &AccountEvent) -> Result<()> {
        if self.failing {
            return Err(LedgerError::Internal(Box::new(std::io::Error::other(
                "event bus unavailable",
            ))));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
