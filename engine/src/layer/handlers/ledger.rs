use super::super::*;
use anyhow::bail;
use tivoli_types::{
    api::{LedgerOutcome, Rejection},
    economy::{Currency, LedgerSource},
};

impl<'a, S: State> Layer<'a, S> {
    /// Write the new balance and exactly one ledger entry as a single staged
    /// batch. Callers have already validated the delta.
    async fn ledger_apply(
        &mut self,
        account: &PublicKey,
        delta: i64,
        new_balance: u64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<u64> {
        let mut balance = self.get_balance(account).await?;
        balance.set(currency, new_balance);

        let mut ledger = self.get_ledger(account).await?;
        let entry_id = ledger.append(
            delta,
            currency,
            source,
            description.to_string(),
            new_balance,
            now,
        );

        self.insert(Key::Balance(account.clone()), Value::Balance(balance));
        self.insert(Key::Ledger(account.clone()), Value::Ledger(ledger));
        Ok(entry_id)
    }

    pub(crate) async fn ledger_credit(
        &mut self,
        account: &PublicKey,
        amount: u64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<LedgerOutcome> {
        if amount == 0 {
            bail!("internal error: ledger credit with zero amount");
        }

        let balance = self.get_balance(account).await?.get(currency);
        let new_balance = balance.saturating_add(amount);
        let entry_id = self
            .ledger_apply(
                account,
                amount as i64,
                new_balance,
                currency,
                source,
                description,
                now,
            )
            .await?;

        Ok(LedgerOutcome::Applied {
            entry_id,
            balance_after: new_balance,
        })
    }

    pub(crate) async fn ledger_debit(
        &mut self,
        account: &PublicKey,
        amount: u64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<LedgerOutcome> {
        if amount == 0 {
            bail!("internal error: ledger debit with zero amount");
        }

        let balance = self.get_balance(account).await?.get(currency);
        if balance < amount {
            return Ok(LedgerOutcome::Rejected(Rejection::InsufficientBalance));
        }

        let new_balance = balance - amount;
        let entry_id = self
            .ledger_apply(
                account,
                -(amount as i64),
                new_balance,
                currency,
                source,
                description,
                now,
            )
            .await?;

        Ok(LedgerOutcome::Applied {
            entry_id,
            balance_after: new_balance,
        })
    }

    pub(crate) async fn ledger_adjust(
        &mut self,
        account: &PublicKey,
        delta: i64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<LedgerOutcome> {
        if delta == 0 {
            bail!("internal error: ledger adjust with zero delta");
        }
        if delta > 0 {
            return self
                .ledger_credit(account, delta as u64, currency, source, description, now)
                .await;
        }
        self.ledger_debit(
            account,
            delta.unsigned_abs(),
            currency,
            source,
            description,
            now,
        )
        .await
    }
}
