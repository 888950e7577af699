use crate::domain::account::Account;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Flat view of an account as written to the report.
#[derive(Debug, Serialize)]
struct AccountRecord<'a> {
    account: &'a str,
    number: &'a str,
    status: String,
    balance: String,
    available_balance: String,
}

/// Writes the final account report as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per `(alias, account)` pair, in the order given.
    ///
    /// Balances are written normalized (`1.50` becomes `1.5`).
    pub fn write_accounts<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a Account)>,
    {
        let mut wrote_any = false;
        for (alias, account) in rows {
            self.writer.serialize(AccountRecord {
                account: alias,
                number: account.account_number.as_str(),
                status: account.status.to_string(),
                balance: account.balance.to_string(),
                available_balance: account.available_balance.to_string(),
            })?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record([
                "account",
                "number",
                "status",
                "balance",
                "available_balance",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
