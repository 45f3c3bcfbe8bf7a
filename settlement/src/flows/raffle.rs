use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use tivoli_types::api::{
    FinalizeAction, FinalizeOutcome, Payout, Rejection, ReserveOutcome, SettleOutcome,
    SlotDisposition,
};
use tivoli_types::economy::{
    ClaimKind, GuardStatus, LedgerSource, PoolId, Resource, StoredResult,
};
use tracing::{debug, warn};

use super::{settlement_hint, Flows};
use crate::bridge::Settlement;
use tivoli_engine::{ReserveRequest, State};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    Entered { claim_id: u64, balance_after: u64 },
    Rejected(Rejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayoutOutcome {
    Paid { claim_id: u64, amount: u64 },
    /// An earlier payout for this winner already settled; nothing re-ran.
    AlreadyPaid { claim_id: u64 },
    /// The external service definitively refused; the prize slot was
    /// returned and the payout may be retried.
    Failed { claim_id: u64 },
    /// Neither confirmed nor denied: parked for reconciliation, slot kept.
    Uncertain { claim_id: u64 },
    Rejected(Rejection),
}

impl<S: State, B: Settlement> Flows<S, B> {
    /// Buy one raffle entry: points debit plus a per-day entry allowance.
    pub async fn enter_raffle(
        &self,
        account: &PublicKey,
        raffle_id: u32,
        now: u64,
    ) -> Result<EntryOutcome> {
        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::RaffleEntry,
            pool: None,
            allowance: Some((Resource::RaffleEntry, self.config.raffle.daily_entry_limit)),
            wager: self.config.raffle.entry_cost,
            wager_source: LedgerSource::RaffleEntry,
            wager_description: format!("raffle {raffle_id} entry"),
            bump_pity: false,
        };

        let claim_id = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Reserved { claim_id, .. } => claim_id,
            ReserveOutcome::Rejected(reason) => return Ok(EntryOutcome::Rejected(reason)),
        };

        // The entry is final as soon as the debit lands.
        let action = FinalizeAction {
            payout: Payout::None,
            slot: SlotDisposition::Consume,
            duplicate_conversion: 0,
        };
        match self.engine.finalize(claim_id, &action, now).await? {
            FinalizeOutcome::Finalized { .. } => {
                let balance_after = self.engine.balance(account).await?.points;
                Ok(EntryOutcome::Entered {
                    claim_id,
                    balance_after,
                })
            }
            FinalizeOutcome::Rejected(reason) => Ok(EntryOutcome::Rejected(reason)),
        }
    }

    /// Pay one raffle winner through the external crediting service. The
    /// raffle's prize pool bounds the number of payouts; the guard key makes
    /// the payout submission at-most-once per winner; the settlement hint
    /// makes the external grant idempotent across reconciliation retries.
    pub async fn pay_raffle_winner(
        &self,
        account: &PublicKey,
        raffle_id: u32,
        now: u64,
    ) -> Result<PayoutOutcome> {
        let guard_key = format!(
            "raffle-{raffle_id}-{}",
            commonware_utils::hex(account.as_ref())
        );

        if let Some(record) = self.engine.guard_lookup(&guard_key, now).await? {
            if record.status == GuardStatus::Done {
                if let Some(StoredResult::Settled { claim_id }) = record.result {
                    debug!(raffle_id, claim_id, "raffle payout replayed");
                    return Ok(PayoutOutcome::AlreadyPaid { claim_id });
                }
            }
            return Ok(PayoutOutcome::Rejected(Rejection::GuardHeld));
        }
        if !self
            .engine
            .guard_acquire(&guard_key, self.config.idempotency_ttl_secs, now)
            .await?
        {
            return Ok(PayoutOutcome::Rejected(Rejection::GuardHeld));
        }

        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::RafflePayout,
            pool: Some(PoolId::Raffle(raffle_id)),
            allowance: None,
            wager: 0,
            wager_source: LedgerSource::RaffleEntry,
            wager_description: String::new(),
            bump_pity: false,
        };
        let claim_id = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Reserved { claim_id, .. } => claim_id,
            ReserveOutcome::Rejected(reason) => {
                self.engine.guard_release(&guard_key).await?;
                return Ok(PayoutOutcome::Rejected(reason));
            }
        };

        let amount = self.config.raffle.prize_amount;
        let hint = settlement_hint(claim_id, ClaimKind::RafflePayout);
        match self.bridge.settle(account, amount, &hint).await {
            SettleOutcome::Success => {
                let action = FinalizeAction {
                    payout: Payout::External { amount },
                    slot: SlotDisposition::Consume,
                    duplicate_conversion: 0,
                };
                match self.engine.finalize(claim_id, &action, now).await? {
                    FinalizeOutcome::Finalized { .. } => {
                        self.engine
                            .guard_complete(
                                &guard_key,
                                StoredResult::Settled { claim_id },
                                self.config.idempotency_ttl_secs,
                                now,
                            )
                            .await?;
                        Ok(PayoutOutcome::Paid { claim_id, amount })
                    }
                    FinalizeOutcome::Rejected(reason) => Ok(PayoutOutcome::Rejected(reason)),
                }
            }
            SettleOutcome::Failure => {
                self.engine.rollback(claim_id, now).await?;
                self.engine.guard_release(&guard_key).await?;
                Ok(PayoutOutcome::Failed { claim_id })
            }
            SettleOutcome::Uncertain => {
                // Keep the guard: a blind resubmission must not start a
                // second payout while this one's fate is unknown.
                warn!(raffle_id, claim_id, "raffle payout uncertain");
                self.engine.mark_uncertain(claim_id, amount, now).await?;
                Ok(PayoutOutcome::Uncertain { claim_id })
            }
        }
    }
}
