//! Recovery sweep and uncertain-claim reconciliation.
//!
//! Two background duties keep the pools honest:
//! - claims stuck `Pending` past a threshold (the caller died between
//!   reserve and finalize/rollback) are compensated via normal rollback;
//! - claims parked `Uncertain` are retried against the external service
//!   with their original idempotency hint. A confirmed grant finalizes
//!   exactly once; anything else leaves the claim parked, since an uncertain
//!   claim is never rolled back, even by the sweep.

use anyhow::Result;
use tivoli_types::api::{
    FinalizeAction, FinalizeOutcome, Payout, RollbackOutcome, SettleOutcome, SlotDisposition,
};
use tivoli_types::economy::{ClaimKind, PoolId, StoredResult};
use tracing::{info, warn};

use crate::bridge::Settlement;
use crate::flows::{hint_for, Flows};
use tivoli_engine::State;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rolled_back: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Confirmed by the external service and finalized.
    pub confirmed: Vec<u64>,
    /// Still ambiguous; attempts bumped, parked for the next pass.
    pub still_uncertain: Vec<u64>,
    /// The external service now reports a definitive refusal. Compensation
    /// stays blocked (the earlier attempt may still have landed out of
    /// band); surfaced for manual review instead.
    pub refused: Vec<u64>,
}

impl<S: State, B: Settlement> Flows<S, B> {
    /// Roll back claims that sat `Pending` longer than the configured
    /// threshold.
    pub async fn sweep_stuck(&self, now: u64) -> Result<SweepReport> {
        let cutoff = now.saturating_sub(self.config.stuck_claim_secs);
        let mut report = SweepReport::default();

        for claim in self.engine.stuck_claims(cutoff).await? {
            match self.engine.rollback(claim.id, now).await? {
                RollbackOutcome::RolledBack => {
                    info!(claim_id = claim.id, kind = ?claim.kind, "stuck claim rolled back");
                    report.rolled_back.push(claim.id);
                }
                // Settled (or parked uncertain) since we listed it.
                RollbackOutcome::AlreadySettled => {}
                RollbackOutcome::Rejected(reason) => {
                    warn!(claim_id = claim.id, %reason, "stuck claim rollback refused");
                }
            }
        }
        Ok(report)
    }

    /// Retry every parked claim against the external service, idempotent on
    /// the original hint.
    pub async fn reconcile_uncertain(&self, now: u64) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for claim in self.engine.uncertain_claims().await? {
            let hint = hint_for(&claim);
            match self
                .bridge
                .settle(&claim.account, claim.external_amount, &hint)
                .await
            {
                SettleOutcome::Success => {
                    let action = FinalizeAction {
                        payout: Payout::External {
                            amount: claim.external_amount,
                        },
                        slot: SlotDisposition::Consume,
                        duplicate_conversion: 0,
                    };
                    match self.engine.finalize(claim.id, &action, now).await? {
                        FinalizeOutcome::Finalized { .. } => {
                            info!(claim_id = claim.id, "uncertain claim confirmed");
                            self.complete_payout_guard(&claim, now).await?;
                            report.confirmed.push(claim.id);
                        }
                        FinalizeOutcome::Rejected(reason) => {
                            warn!(claim_id = claim.id, %reason, "confirmed claim failed to finalize");
                        }
                    }
                }
                SettleOutcome::Uncertain => {
                    self.engine
                        .mark_uncertain(claim.id, claim.external_amount, now)
                        .await?;
                    report.still_uncertain.push(claim.id);
                }
                SettleOutcome::Failure => {
                    warn!(
                        claim_id = claim.id,
                        "uncertain claim refused on retry; manual review required"
                    );
                    report.refused.push(claim.id);
                }
            }
        }
        Ok(report)
    }

    /// A raffle payout confirmed by reconciliation still owes its guard a
    /// stored result, so replayed payout requests return `AlreadyPaid`.
    async fn complete_payout_guard(
        &self,
        claim: &tivoli_types::economy::PendingClaim,
        now: u64,
    ) -> Result<()> {
        if claim.kind != ClaimKind::RafflePayout {
            return Ok(());
        }
        let Some(PoolId::Raffle(raffle_id)) = claim.pool else {
            return Ok(());
        };
        let guard_key = format!(
            "raffle-{raffle_id}-{}",
            commonware_utils::hex(claim.account.as_ref())
        );
        self.engine
            .guard_complete(
                &guard_key,
                StoredResult::Settled { claim_id: claim.id },
                self.config.idempotency_ttl_secs,
                now,
            )
            .await
    }
}
