use super::super::*;
use tivoli_types::{
    api::{GrantResult, LedgerOutcome},
    economy::{day_index, Currency, DailyCounter, LedgerSource},
};

impl<'a, S: State> Layer<'a, S> {
    /// Credit up to the day's remaining headroom for `resource`. The
    /// triggering action already happened, so over-cap amounts are clipped
    /// silently rather than rejected; a clipped-to-zero grant writes no
    /// ledger entry.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn quota_grant_up_to(
        &mut self,
        account: &PublicKey,
        resource: Resource,
        requested: u64,
        daily_limit: u64,
        source: LedgerSource,
        description: &str,
        now: u64,
        day_offset_secs: i32,
    ) -> Result<GrantResult> {
        let day = day_index(now, day_offset_secs);
        let counter = self.get_daily_counter(account, resource, day).await?;

        let headroom = daily_limit.saturating_sub(counter.used);
        let granted = requested.min(headroom);

        // Yesterday's counter is dead once today exists; drop it while the
        // record is in hand rather than running a cleanup job.
        if day > 0 {
            self.remove(Key::DailyCounter(account.clone(), resource, day - 1));
        }

        let used_today = counter.used.saturating_add(granted);
        self.insert(
            Key::DailyCounter(account.clone(), resource, day),
            Value::DailyCounter(DailyCounter { used: used_today }),
        );

        let balance_after = if granted > 0 {
            match self
                .ledger_credit(
                    account,
                    granted,
                    Currency::Points,
                    source,
                    description,
                    now,
                )
                .await?
            {
                LedgerOutcome::Applied { balance_after, .. } => balance_after,
                LedgerOutcome::Rejected(_) => unreachable!("credit cannot reject"),
            }
        } else {
            self.get_balance(account).await?.points
        };

        Ok(GrantResult {
            granted,
            used_today,
            balance_after,
        })
    }

    /// Consume `count` units of a per-day allowance without crediting
    /// anything. Returns false (and stages nothing) when the allowance is
    /// exhausted.
    pub(crate) async fn quota_consume(
        &mut self,
        account: &PublicKey,
        resource: Resource,
        count: u64,
        daily_limit: u64,
        now: u64,
        day_offset_secs: i32,
    ) -> Result<bool> {
        let day = day_index(now, day_offset_secs);
        let counter = self.get_daily_counter(account, resource, day).await?;
        if counter.used.saturating_add(count) > daily_limit {
            return Ok(false);
        }

        if day > 0 {
            self.remove(Key::DailyCounter(account.clone(), resource, day - 1));
        }
        self.insert(
            Key::DailyCounter(account.clone(), resource, day),
            Value::DailyCounter(DailyCounter {
                used: counter.used.saturating_add(count),
            }),
        );
        Ok(true)
    }

    /// Give back `count` units consumed at `counted_at` (reservation
    /// rollback, possibly across a midnight boundary).
    pub(crate) async fn quota_uncount(
        &mut self,
        account: &PublicKey,
        resource: Resource,
        count: u64,
        counted_at: u64,
        day_offset_secs: i32,
    ) -> Result<()> {
        let day = day_index(counted_at, day_offset_secs);
        let counter = self.get_daily_counter(account, resource, day).await?;
        self.insert(
            Key::DailyCounter(account.clone(), resource, day),
            Value::DailyCounter(DailyCounter {
                used: counter.used.saturating_sub(count),
            }),
        );
        Ok(())
    }

    pub(crate) async fn quota_usage(
        &self,
        account: &PublicKey,
        resource: Resource,
        now: u64,
        day_offset_secs: i32,
    ) -> Result<u64> {
        let day = day_index(now, day_offset_secs);
        Ok(self.get_daily_counter(account, resource, day).await?.used)
    }
}
