use crate::domain::account::{
    Account, AccountId, AccountNumber, AccountStatus, CustomerId, LifecycleAction,
};
use crate::domain::hold::{Hold, HoldId};
use crate::domain::ports::LedgerStore;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, ErrorKind, IteratorMode, Options, Transaction,
    TransactionDB, TransactionDBOptions,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for account rows, keyed by account id.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family mapping account numbers to account ids (unique index).
pub const CF_ACCOUNT_NUMBERS: &str = "account_numbers";
/// Column Family for hold rows, keyed by hold id.
pub const CF_HOLDS: &str = "holds";

type Txn<'db> = Transaction<'db, TransactionDB>;

/// A persistent ledger store on top of a pessimistic RocksDB `TransactionDB`.
///
/// `get_for_update_cf` with `exclusive = true` takes the row lock: every
/// mutation locks the account key for the duration of its transaction and
/// re-evaluates its guard against the locked value. A transaction that is not
/// committed is rolled back when dropped.
///
/// RocksDB calls block the calling task and every method runs to completion
/// without yielding, so the service-level storage deadline cannot interrupt
/// them. Waits on a contended row are bounded by `lock_timeout_ms` instead.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<TransactionDB>,
}

fn storage_error(err: rocksdb::Error) -> LedgerError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::Busy | ErrorKind::Expired => LedgerError::Timeout,
        _ => LedgerError::RocksDb(err),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

impl RocksDbLedgerStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist. `lock_timeout_ms`
    /// bounds how long a transaction waits for a row lock before failing with
    /// `Timeout`; it is the only deadline this store observes.
    pub fn open<P: AsRef<Path>>(path: P, lock_timeout_ms: i64) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(lock_timeout_ms);

        let descriptors = [CF_ACCOUNTS, CF_ACCOUNT_NUMBERS, CF_HOLDS]
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(&opts, &txn_opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::Internal(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    /// Runs `body` inside a transaction and commits it. Any error drops the
    /// transaction, which rolls every write back.
    fn transact<T>(&self, body: impl FnOnce(&Txn<'_>) -> Result<T>) -> Result<T> {
        let txn = self.db.transaction();
        let value = body(&txn)?;
        txn.commit().map_err(storage_error)?;
        Ok(value)
    }

    fn lock_account(&self, txn: &Txn<'_>, id: AccountId) -> Result<Account> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let bytes = txn
            .get_for_update_cf(cf, id.as_uuid().as_bytes(), true)
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        decode(&bytes)
    }

    fn put_account(&self, txn: &Txn<'_>, account: &Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        txn.put_cf(cf, account.id.as_uuid().as_bytes(), encode(account)?)
            .map_err(storage_error)
    }

    /// Applies `change` to the locked account row and writes it back.
    fn mutate_account(
        &self,
        id: AccountId,
        change: impl FnOnce(&mut Account) -> Result<()>,
    ) -> Result<Account> {
        self.transact(|txn| {
            let mut account = self.lock_account(txn, id)?;
            change(&mut account)?;
            self.put_account(txn, &account)?;
            Ok(account)
        })
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item.map_err(storage_error)?;
            rows.push(decode(&value)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn create_account(&self, account: Account) -> Result<()> {
        self.transact(|txn| {
            let numbers = self.cf(CF_ACCOUNT_NUMBERS)?;
            let accounts = self.cf(CF_ACCOUNTS)?;
            let number_key = account.account_number.as_str().as_bytes();
            let id_key = account.id.as_uuid().as_bytes();

            if txn
                .get_for_update_cf(numbers, number_key, true)
                .map_err(storage_error)?
                .is_some()
            {
                return Err(LedgerError::AlreadyExists(format!(
                    "account number {}",
                    account.account_number
                )));
            }
            if txn
                .get_for_update_cf(accounts, id_key, true)
                .map_err(storage_error)?
                .is_some()
            {
                return Err(LedgerError::AlreadyExists(format!("account {}", account.id)));
            }

            txn.put_cf(numbers, number_key, id_key)
                .map_err(storage_error)?;
            self.put_account(txn, &account)
        })
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Account> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let bytes = self
            .db
            .get_cf(cf, id.as_uuid().as_bytes())
            .map_err(storage_error)?
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        decode(&bytes)
    }

    async fn get_account_by_number(&self, number: &AccountNumber) -> Result<Account> {
        let id = {
            let cf = self.cf(CF_ACCOUNT_NUMBERS)?;
            let id_bytes = self
                .db
                .get_cf(cf, number.as_str().as_bytes())
                .map_err(storage_error)?
                .ok_or_else(|| LedgerError::account_not_found(number))?;
            uuid::Uuid::from_slice(&id_bytes).map_err(|e| LedgerError::Internal(Box::new(e)))?
        };
        self.get_account_by_id(AccountId::from_uuid(id)).await
    }

    async fn get_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let mut owned: Vec<Account> = self
            .scan::<Account>(CF_ACCOUNTS)?
            .into_iter()
            .filter(|account| account.customer_id == customer_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update_status_and_rate(
        &self,
        id: AccountId,
        status: Option<AccountStatus>,
        interest_rate: Option<Decimal>,
    ) -> Result<Account> {
        self.mutate_account(id, |account| account.amend(status, interest_rate, Utc::now()))
    }

    async fn change_status(
        &self,
        id: AccountId,
        action: LifecycleAction,
        at: DateTime<Utc>,
    ) -> Result<Account> {
        self.mutate_account(id, |account| account.apply(action, at))
    }

    async fn apply_balance_delta(&self, id: AccountId, delta: Decimal) -> Result<()> {
        self.mutate_account(id, |account| account.apply_delta(delta, Utc::now()))
            .map(|_| ())
    }

    async fn create_hold(&self, hold: Hold) -> Result<()> {
        self.transact(|txn| {
            let holds = self.cf(CF_HOLDS)?;
            let mut account = self.lock_account(txn, hold.account_id)?;
            account.reserve(hold.amount, Utc::now())?;

            let hold_key = hold.id.as_uuid().as_bytes();
            if txn
                .get_for_update_cf(holds, hold_key, true)
                .map_err(storage_error)?
                .is_some()
            {
                return Err(LedgerError::AlreadyExists(format!("hold {}", hold.id)));
            }
            txn.put_cf(holds, hold_key, encode(&hold)?)
                .map_err(storage_error)?;
            self.put_account(txn, &account)
        })
    }

    async fn release_hold(&self, hold_id: HoldId, released_at: DateTime<Utc>) -> Result<Hold> {
        self.transact(|txn| {
            let holds = self.cf(CF_HOLDS)?;
            let hold_key = hold_id.as_uuid().as_bytes();
            let bytes = txn
                .get_for_update_cf(holds, hold_key, true)
                .map_err(storage_error)?
                .ok_or(LedgerError::HoldNotFound(hold_id))?;
            let mut hold: Hold = decode(&bytes)?;
            if !hold.mark_released(released_at) {
                return Err(LedgerError::AlreadyReleased(hold_id));
            }

            let mut account = self.lock_account(txn, hold.account_id)?;
            account.restore(hold.amount, released_at)?;

            txn.put_cf(holds, hold_key, encode(&hold)?)
                .map_err(storage_error)?;
            self.put_account(txn, &account)?;
            Ok(hold)
        })
    }

    async fn get_hold(&self, hold_id: HoldId) -> Result<Hold> {
        let cf = self.cf(CF_HOLDS)?;
        let bytes = self
            .db
            .get_cf(cf, hold_id.as_uuid().as_bytes())
            .map_err(storage_error)?
            .ok_or(LedgerError::HoldNotFound(hold_id))?;
        decode(&bytes)
    }

    async fn active_holds(&self, account_id: AccountId) -> Result<Vec<Hold>> {
        let mut active: Vec<Hold> = self
            .scan::<Hold>(CF_HOLDS)?
            .into_iter()
            .filter(|hold| hold.account_id == account_id && hold.is_active())
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountType, Amount, Balance};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn new_account(number: &str) -> Account {
        Account::open(
            CustomerId::new(),
            AccountType::Savings,
            "NGN".to_string(),
            AccountNumber::parse(number).unwrap(),
            dec!(0.01),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbLedgerStore::open(dir.path(), 1_000).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(store.db.cf_handle(CF_ACCOUNT_NUMBERS).is_some());
        assert!(store.db.cf_handle(CF_HOLDS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_account_rows() {
        let dir = tempdir().unwrap();
        let store = RocksDbLedgerStore::open(dir.path(), 1_000).unwrap();

        let account = new_account("12-0000-0001");
        store.create_account(account.clone()).await.unwrap();

        assert_eq!(store.get_account_by_id(account.id).await.unwrap(), account);
        assert_eq!(
            store
                .get_account_by_number(&account.account_number)
                .await
                .unwrap(),
            account
        );
        assert_eq!(
            store
                .get_accounts_by_customer(account.customer_id)
                .await
                .unwrap()
                .len(),
            1
        );

        let duplicate = store.create_account(new_account("12-0000-0001")).await;
        assert!(matches!(duplicate, Err(LedgerError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_rocksdb_balance_and_holds() {
        let dir = tempdir().unwrap();
        let store = RocksDbLedgerStore::open(dir.path(), 1_000).unwrap();
        let account = new_account("12-0000-0002");
        store.create_account(account.clone()).await.unwrap();

        store
            .apply_balance_delta(account.id, dec!(100))
            .await
            .unwrap();
        let overdraw = store.apply_balance_delta(account.id, dec!(-100.01)).await;
        assert!(matches!(overdraw, Err(LedgerError::InsufficientFunds(_))));

        let hold = Hold::new(
            account.id,
            Amount::new(dec!(40)).unwrap(),
            "order-1",
            Some("tx-1".to_string()),
            None,
            Utc::now(),
        );
        store.create_hold(hold.clone()).await.unwrap();
        let too_big = Hold::new(
            account.id,
            Amount::new(dec!(60.01)).unwrap(),
            "order-2",
            None,
            None,
            Utc::now(),
        );
        assert!(matches!(
            store.create_hold(too_big).await,
            Err(LedgerError::InsufficientFunds(_))
        ));

        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.available_balance, Balance::new(dec!(60)));
        assert_eq!(store.active_holds(account.id).await.unwrap(), vec![hold.clone()]);

        store.release_hold(hold.id, Utc::now()).await.unwrap();
        assert!(matches!(
            store.release_hold(hold.id, Utc::now()).await,
            Err(LedgerError::AlreadyReleased(_))
        ));
        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.available_balance, Balance::new(dec!(100)));
    }

    #[tokio::test]
    async fn test_rocksdb_closed_row_is_terminal() {
        let dir = tempdir().unwrap();
        let store = RocksDbLedgerStore::open(dir.path(), 1_000).unwrap();
        let account = new_account("12-0000-0004");
        store.create_account(account.clone()).await.unwrap();

        let closed = store
            .change_status(account.id, LifecycleAction::Close, Utc::now())
            .await
            .unwrap();
        assert_eq!(closed.status, AccountStatus::Closed);

        assert!(matches!(
            store
                .change_status(account.id, LifecycleAction::Freeze, Utc::now())
                .await,
            Err(LedgerError::InvalidState(_))
        ));
        assert!(matches!(
            store
                .update_status_and_rate(account.id, Some(AccountStatus::Active), Some(dec!(0.2)))
                .await,
            Err(LedgerError::InvalidState(_))
        ));
        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.status, AccountStatus::Closed);
        assert_eq!(stored.closed_at, closed.closed_at);
        assert_eq!(stored.interest_rate, dec!(0.01));
    }

    #[tokio::test]
    async fn test_rocksdb_lock_wait_times_out() {
        let dir = tempdir().unwrap();
        let store = RocksDbLedgerStore::open(dir.path(), 50).unwrap();
        let account = new_account("12-0000-0005");
        store.create_account(account.clone()).await.unwrap();

        let txn = store.db.transaction();
        store.lock_account(&txn, account.id).unwrap();

        let blocked = store.apply_balance_delta(account.id, dec!(1)).await;
        assert!(matches!(blocked, Err(LedgerError::Timeout)));

        drop(txn);
        store.apply_balance_delta(account.id, dec!(1)).await.unwrap();
        assert_eq!(
            store.get_account_by_id(account.id).await.unwrap().balance,
            Balance::new(dec!(1))
        );
    }

    #[tokio::test]
    async fn test_rocksdb_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let account = new_account("12-0000-0003");
        {
            let store = RocksDbLedgerStore::open(dir.path(), 1_000).unwrap();
            store.create_account(account.clone()).await.unwrap();
            store
                .apply_balance_delta(account.id, dec!(42.5))
                .await
                .unwrap();
        }

        let store = RocksDbLedgerStore::open(dir.path(), 1_000).unwrap();
        let stored = store.get_account_by_id(account.id).await.unwrap();
        assert_eq!(stored.balance, Balance::new(dec!(42.5)));
    }
}
