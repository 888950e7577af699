//! Application layer containing the core ledger logic.
//!
//! `AccountLifecycle`, `BalanceMutator` and `HoldManager` enforce the business
//! preconditions and delegate every read-modify-write to the `LedgerStore`
//! port. None of them publish anything: a successful mutation hands back the
//! domain event it produced inside a [`Committed`], and `LedgerService` queues
//! it on the `EventOutbox` for a separate publisher task to drain.

pub mod holds;
pub mod lifecycle;
pub mod mutator;
pub mod outbox;
pub mod service;

use crate::domain::events::AccountEvent;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Result of a committed mutation plus the event it should announce.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub event: Option<AccountEvent>,
}

impl<T> Committed<T> {
    pub fn with_event(value: T, event: AccountEvent) -> Self {
        Self {
            value,
            event: Some(event),
        }
    }

    pub fn silent(value: T) -> Self {
        Self { value, event: None }
    }
}

/// Bounds a storage call by `deadline`. On expiry the store future is dropped,
/// which the store contract guarantees leaves no partial effect.
pub(crate) async fn within<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(deadline, call).await?
}
