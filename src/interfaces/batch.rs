use crate::application::holds::HoldRequest;
use crate::application::lifecycle::OpenAccount;
use crate::application::service::LedgerService;
use crate::domain::account::{Account, AccountId, AccountType, CustomerId};
use crate::domain::hold::HoldId;
use crate::error::{LedgerError, Result};
use crate::interfaces::csv::command_reader::{CommandType, LedgerCommand};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Applies batch commands to a [`LedgerService`].
///
/// Account and hold columns in a batch are aliases; the runner keeps the
/// mapping to the ids the ledger hands out. Every account opened by one runner
/// belongs to the same customer.
pub struct BatchRunner<'a> {
    ledger: &'a LedgerService,
    customer: CustomerId,
    accounts: BTreeMap<String, AccountId>,
    holds: HashMap<String, HoldId>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(ledger: &'a LedgerService) -> Self {
        Self {
            ledger,
            customer: CustomerId::new(),
            accounts: BTreeMap::new(),
            holds: HashMap::new(),
        }
    }

    pub async fn apply(&mut self, command: LedgerCommand) -> Result<()> {
        match command.op {
            CommandType::Open => self.open(command).await,
            CommandType::Credit => {
                let id = self.account(&command.account)?;
                self.ledger.credit(id, required_amount(&command)?).await?;
                Ok(())
            }
            CommandType::Debit => {
                let id = self.account(&command.account)?;
                self.ledger.debit(id, required_amount(&command)?).await?;
                Ok(())
            }
            CommandType::Hold => self.hold(command).await,
            CommandType::Release => {
                let alias = required(command.reference, "release needs a hold reference")?;
                let hold_id = *self
                    .holds
                    .get(&alias)
                    .ok_or_else(|| LedgerError::invalid(format!("unknown hold '{}'", alias)))?;
                self.ledger.release_hold(hold_id).await?;
                Ok(())
            }
            CommandType::Freeze => {
                self.ledger.freeze_account(self.account(&command.account)?).await?;
                Ok(())
            }
            CommandType::Unfreeze => {
                self.ledger.unfreeze_account(self.account(&command.account)?).await?;
                Ok(())
            }
            CommandType::Close => {
                self.ledger.close_account(self.account(&command.account)?).await?;
                Ok(())
            }
        }
    }

    /// Current state of every opened account, ordered by alias.
    pub async fn report(&self) -> Result<Vec<(String, Account)>> {
        let mut rows = Vec::with_capacity(self.accounts.len());
        for (alias, id) in &self.accounts {
            rows.push((alias.clone(), self.ledger.get_account(*id).await?));
        }
        Ok(rows)
    }

    async fn open(&mut self, command: LedgerCommand) -> Result<()> {
        if self.accounts.contains_key(&command.account) {
            return Err(LedgerError::AlreadyExists(format!(
                "account alias '{}'",
                command.account
            )));
        }
        let account_type = match command.detail.as_deref() {
            Some(kind) if !kind.is_empty() => kind.parse()?,
            _ => AccountType::Checking,
        };
        let account = self
            .ledger
            .create_account(OpenAccount::new(self.customer, account_type))
            .await?;
        self.accounts.insert(command.account, account.id);
        Ok(())
    }

    async fn hold(&mut self, command: LedgerCommand) -> Result<()> {
        let id = self.account(&command.account)?;
        let amount = required_amount(&command)?;
        let alias = required(command.reference, "hold needs a reference")?;
        if self.holds.contains_key(&alias) {
            return Err(LedgerError::AlreadyExists(format!("hold alias '{}'", alias)));
        }
        let reason = required(command.detail, "hold needs a reason")?;
        let hold = self
            .ledger
            .create_hold(HoldRequest::new(id, amount, reason).with_transaction_ref(alias.clone()))
            .await?;
        self.holds.insert(alias, hold.id);
        Ok(())
    }

    fn account(&self, alias: &str) -> Result<AccountId> {
        self.accounts
            .get(alias)
            .copied()
            .ok_or_else(|| LedgerError::account_not_found(alias))
    }
}

fn required_amount(command: &LedgerCommand) -> Result<Decimal> {
    command
        .amount
        .ok_or_else(|| LedgerError::invalid(format!("{:?} needs an amount", command.op)))
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LedgerError::invalid(message))
}
