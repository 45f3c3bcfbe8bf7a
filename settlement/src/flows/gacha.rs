use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use rand::Rng;
use tivoli_types::api::{
    FinalizeAction, FinalizeOutcome, Payout, Rejection, ReserveOutcome, SlotDisposition,
};
use tivoli_types::economy::{ClaimKind, LedgerSource, Tier};
use tracing::debug;

use super::Flows;
use crate::bridge::Settlement;
use tivoli_engine::decide::{decide_item, decide_tier};
use tivoli_engine::{ReserveRequest, State};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn {
        claim_id: u64,
        tier: Tier,
        item_id: u16,
        /// A pity threshold raised the outcome above the random roll.
        forced: bool,
        duplicate: bool,
        conversion: u64,
    },
    Rejected(Rejection),
}

impl<S: State, B: Settlement> Flows<S, B> {
    /// One gacha pull: debit the draw cost, advance the guarantee counters,
    /// pick a tier (pity override included) and commit the item. Entirely
    /// internal: no external settlement, so the only rollback trigger is a
    /// decide-window fault, which the recovery sweep also covers.
    pub async fn draw(
        &self,
        account: &PublicKey,
        now: u64,
        rng: &mut impl Rng,
    ) -> Result<DrawOutcome> {
        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::GachaDraw,
            pool: None,
            allowance: None,
            wager: self.config.gacha.draw_cost,
            wager_source: LedgerSource::GachaDraw,
            wager_description: "gacha draw".to_string(),
            bump_pity: true,
        };

        let (claim_id, pity) = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Reserved { claim_id, pity } => (claim_id, pity.unwrap_or_default()),
            ReserveOutcome::Rejected(reason) => return Ok(DrawOutcome::Rejected(reason)),
        };

        // Decide outside the store, against the post-bump counters.
        let pick = decide_tier(&self.config.gacha, &pity, rng);
        let item_id = decide_item(&self.config.gacha, pick.tier, rng);
        debug!(claim_id, tier = ?pick.tier, item_id, forced = pick.forced, "draw decided");

        let action = FinalizeAction {
            payout: Payout::Item {
                item_id,
                tier: pick.tier,
            },
            slot: SlotDisposition::Consume,
            duplicate_conversion: self.config.gacha.conversion.get(pick.tier),
        };
        match self.engine.finalize(claim_id, &action, now).await? {
            FinalizeOutcome::Finalized {
                duplicate,
                conversion,
                ..
            } => Ok(DrawOutcome::Drawn {
                claim_id,
                tier: pick.tier,
                item_id,
                forced: pick.forced,
                duplicate,
                conversion,
            }),
            FinalizeOutcome::Rejected(reason) => Ok(DrawOutcome::Rejected(reason)),
        }
    }
}
