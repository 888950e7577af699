use super::{Committed, within};
use crate::domain::account::{AccountId, Amount, BalanceSnapshot};
use crate::domain::events::AccountEvent;
use crate::domain::ports::LedgerStoreHandle;
use crate::error::Result;
use rust_decimal::Decimal;
use std::time::Duration;

/// Turns debit/credit intent into signed deltas on the ledger.
#[derive(Clone)]
pub struct BalanceMutator {
    store: LedgerStoreHandle,
    deadline: Duration,
}

impl BalanceMutator {
    pub fn new(store: LedgerStoreHandle, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Adds `amount` to the account.
    ///
    /// The returned snapshot is read back after the commit and is `None` when
    /// that read fails; the credit itself has still been applied.
    pub async fn credit(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Committed<Option<BalanceSnapshot>>> {
        let amount = Amount::new(amount)?;
        self.apply(account_id, amount.value()).await
    }

    /// Removes `amount` from the account, failing with `InsufficientFunds`
    /// rather than driving the balance below zero.
    pub async fn debit(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Committed<Option<BalanceSnapshot>>> {
        let amount = Amount::new(amount)?;
        self.apply(account_id, -amount.value()).await
    }

    async fn apply(
        &self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<Committed<Option<BalanceSnapshot>>> {
        // The status read and the guarded update are separate storage calls.
        let account = within(self.deadline, self.store.get_account_by_id(account_id)).await?;
        account.ensure_active()?;

        within(
            self.deadline,
            self.store.apply_balance_delta(account_id, delta),
        )
        .await?;
        tracing::debug!(%account_id, %delta, "balance delta applied");

        match within(self.deadline, self.store.get_account_by_id(account_id)).await {
            Ok(updated) => Ok(Committed::with_event(
                Some(updated.snapshot()),
                AccountEvent::balance_updated(&updated),
            )),
            Err(err) => {
                tracing::warn!(%account_id, error = %err, "balance read-back failed, skipping event");
                Ok(Committed::silent(None))
            }
        }
    }
}
