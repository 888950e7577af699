#![allow(dead_code)]

use account_ledger::application::lifecycle::OpenAccount;
use account_ledger::application::service::LedgerService;
use account_ledger::config::LedgerConfig;
use account_ledger::domain::account::{Account, AccountType, CustomerId};
use account_ledger::domain::events::AccountEvent;
use account_ledger::infrastructure::account_number::RandomAccountNumberGenerator;
use account_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

pub fn ledger() -> (LedgerService, Receiver<AccountEvent>) {
    LedgerService::new(
        Arc::new(InMemoryLedgerStore::new()),
        Box::new(RandomAccountNumberGenerator),
        &LedgerConfig::default(),
    )
}

pub async fn open_funded(ledger: &LedgerService, balance: Decimal) -> Account {
    let account = ledger
        .create_account(OpenAccount::new(CustomerId::new(), AccountType::Checking))
        .await
        .unwrap();
    if !balance.is_zero() {
        ledger.credit(account.id, balance).await.unwrap();
    }
    ledger.get_account(account.id).await.unwrap()
}

/// available = balance - sum(active holds), and balance never goes negative.
pub async fn assert_consistent(ledger: &LedgerService, account: &Account) {
    let current = ledger.get_account(account.id).await.unwrap();
    let held: Decimal = ledger
        .active_holds(account.id)
        .await
        .unwrap()
        .iter()
        .map(|hold| hold.amount.value())
        .sum();
    assert_eq!(current.available_balance.0, current.balance.0 - held);
    assert!(current.balance.0 >= Decimal::ZERO);
}
