use super::account::{AccountId, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

uuid_id!(HoldId, "HoldId");

/// A reservation of funds on one account.
///
/// Holds are never deleted: releasing one stamps `released_at` and the row is
/// kept as an audit record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Hold {
    pub id: HoldId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub reason: String,
    pub transaction_ref: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Hold {
    pub fn new(
        account_id: AccountId,
        amount: Amount,
        reason: impl Into<String>,
        transaction_ref: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HoldId::new(),
            account_id,
            amount,
            reason: reason.into(),
            transaction_ref,
            expires_at,
            released_at: None,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.released_at.is_none()
    }

    /// Stamps the release time. Returns `false` if the hold was already released.
    pub fn mark_released(&mut self, now: DateTime<Utc>) -> bool {
        if self.released_at.is_some() {
            return false;
        }
        self.released_at = Some(now);
        true
    }
}
