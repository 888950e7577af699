use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

uuid_id!(AccountId, "AccountId");
uuid_id!(CustomerId, "CustomerId");

/// Represents a monetary value held on an account.
///
/// This is a wrapper around `rust_decimal::Decimal` so ledger arithmetic never
/// touches binary floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a strictly positive monetary amount for credits, debits and holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::invalid(format!(
                "amount must be greater than zero, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `None` when the sum leaves the representable decimal range.
    pub fn checked_add(self, delta: Decimal) -> Option<Self> {
        self.0.checked_add(delta).map(Self)
    }

    pub fn checked_sub(self, delta: Decimal) -> Option<Self> {
        self.0.checked_sub(delta).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

/// Human-facing account number in the `DD-DDDD-DDDD` layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub const DIGITS: usize = 10;
    const GROUPS: [usize; 3] = [2, 4, 4];

    /// Validates and wraps a formatted account number.
    pub fn parse(raw: &str) -> Result<Self> {
        let groups: Vec<&str> = raw.split('-').collect();
        let well_formed = groups.len() == Self::GROUPS.len()
            && groups
                .iter()
                .zip(Self::GROUPS)
                .all(|(group, len)| group.len() == len && group.bytes().all(|b| b.is_ascii_digit()));

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(LedgerError::invalid(format!(
                "malformed account number '{}'",
                raw
            )))
        }
    }

    /// Builds a number from ten decimal digits (each `0..=9`).
    pub fn from_digits(digits: [u8; Self::DIGITS]) -> Result<Self> {
        if digits.iter().any(|d| *d > 9) {
            return Err(LedgerError::invalid("account number digits must be 0-9"));
        }
        let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        Ok(Self(format!("{}-{}-{}", &text[0..2], &text[2..6], &text[6..10])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
    Pending,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "ACTIVE",
            Self::Frozen => "FROZEN",
            Self::Closed => "CLOSED",
            Self::Pending => "PENDING",
        };
        f.write_str(label)
    }
}

impl FromStr for AccountStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "FROZEN" => Ok(Self::Frozen),
            "CLOSED" => Ok(Self::Closed),
            "PENDING" => Ok(Self::Pending),
            other => Err(LedgerError::invalid(format!("unknown account status '{}'", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => f.write_str("CHECKING"),
            Self::Savings => f.write_str("SAVINGS"),
        }
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHECKING" | "CURRENT" => Ok(Self::Checking),
            "SAVINGS" => Ok(Self::Savings),
            other => Err(LedgerError::invalid(format!("unknown account type '{}'", other))),
        }
    }
}

/// Lifecycle transitions that change an account's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Freeze,
    Unfreeze,
    Close,
}

/// Both balances of an account at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub balance: Balance,
    pub available_balance: Balance,
}

/// A bank account row as owned by the ledger store.
///
/// `available_balance` always equals `balance` minus the amounts of all holds
/// on this account whose `released_at` is still unset.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub currency: String,
    pub balance: Balance,
    pub available_balance: Balance,
    pub status: AccountStatus,
    pub interest_rate: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new, empty account directly in the `ACTIVE` state.
    pub fn open(
        customer_id: CustomerId,
        account_type: AccountType,
        currency: String,
        account_number: AccountNumber,
        interest_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            account_number,
            customer_id,
            account_type,
            currency,
            balance: Balance::ZERO,
            available_balance: Balance::ZERO,
            status: AccountStatus::Active,
            interest_rate,
            opened_at: now,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            balance: self.balance,
            available_balance: self.available_balance,
        }
    }

    /// Only `ACTIVE` accounts accept balance mutations and new holds.
    pub fn ensure_active(&self) -> Result<()> {
        if self.status == AccountStatus::Active {
            Ok(())
        } else {
            Err(LedgerError::AccountNotActive {
                account_id: self.id,
                status: self.status,
            })
        }
    }

    /// Resolves the status an action would move this account to, or the
    /// reason the transition is illegal.
    pub fn transition(&self, action: LifecycleAction) -> Result<AccountStatus> {
        use AccountStatus::*;
        match (action, self.status) {
            (LifecycleAction::Freeze, Active) => Ok(Frozen),
            (LifecycleAction::Freeze, Frozen) => Err(LedgerError::AlreadyFrozen(self.id)),
            (LifecycleAction::Freeze, status) => Err(LedgerError::InvalidState(format!(
                "cannot freeze account {} in status {}",
                self.id, status
            ))),
            (LifecycleAction::Unfreeze, Frozen) => Ok(Active),
            (LifecycleAction::Unfreeze, _) => Err(LedgerError::NotFrozen(self.id)),
            (LifecycleAction::Close, Closed) => Err(LedgerError::AlreadyClosed(self.id)),
            (LifecycleAction::Close, Active | Frozen) if self.balance.is_zero() => Ok(Closed),
            (LifecycleAction::Close, Active | Frozen) => Err(LedgerError::NonZeroBalance {
                account_id: self.id,
                balance: self.balance.value(),
            }),
            (LifecycleAction::Close, Pending) => Err(LedgerError::InvalidState(format!(
                "cannot close pending account {}",
                self.id
            ))),
        }
    }

    /// Applies a signed delta to both balances, refusing to drive `balance`
    /// below zero.
    pub fn apply_delta(&mut self, delta: Decimal, now: DateTime<Utc>) -> Result<()> {
        let balance = self
            .balance
            .checked_add(delta)
            .ok_or_else(|| self.overflow())?;
        if balance.value() < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds(self.id));
        }
        let available_balance = self
            .available_balance
            .checked_add(delta)
            .ok_or_else(|| self.overflow())?;
        self.balance = balance;
        self.available_balance = available_balance;
        self.updated_at = now;
        Ok(())
    }

    /// Reserves `amount` out of the available balance.
    pub fn reserve(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<()> {
        if self.available_balance < Balance::from(amount) {
            return Err(LedgerError::InsufficientFunds(self.id));
        }
        self.available_balance = self
            .available_balance
            .checked_sub(amount.value())
            .ok_or_else(|| self.overflow())?;
        self.updated_at = now;
        Ok(())
    }

    /// Gives a previously reserved amount back to the available balance.
    pub fn restore(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<()> {
        self.available_balance = self
            .available_balance
            .checked_add(amount.value())
            .ok_or_else(|| self.overflow())?;
        self.updated_at = now;
        Ok(())
    }

    /// Applies a lifecycle action, stamping `closed_at` once on close. The
    /// account is left untouched when the transition is illegal.
    pub fn apply(&mut self, action: LifecycleAction, now: DateTime<Utc>) -> Result<()> {
        self.status = self.transition(action)?;
        if self.status == AccountStatus::Closed {
            self.closed_at.get_or_insert(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Last-write-wins administrative update of status and rate.
    ///
    /// `CLOSED` is terminal, and closing must go through [`Account::apply`] so
    /// the zero-balance guard runs.
    pub fn amend(
        &mut self,
        status: Option<AccountStatus>,
        interest_rate: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status == AccountStatus::Closed {
            return Err(LedgerError::InvalidState(format!(
                "account {} is closed",
                self.id
            )));
        }
        if status == Some(AccountStatus::Closed) {
            return Err(LedgerError::invalid(
                "closing an account goes through the close operation",
            ));
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(interest_rate) = interest_rate {
            self.interest_rate = interest_rate;
        }
        self.updated_at = now;
        Ok(())
    }

    fn overflow(&self) -> LedgerError {
        LedgerError::invalid(format!("balance of account {} would overflow", self.id))
    }
}

/// Checks a currency code is three uppercase ASCII letters.
pub fn validate_currency(code: &str) -> Result<String> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(code.to_string())
    } else {
        Err(LedgerError::invalid(format!("invalid currency code '{}'", code)))
    }
}
