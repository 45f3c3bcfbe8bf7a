//! Business flows: the reserve → decide → settle → finalize/rollback wiring
//! for every scarce-resource action.
//!
//! Flows are deliberately thin: all consistency lives in the engine's atomic
//! procedures, and all compensation decisions follow the settlement
//! classification: `Failure` rolls back, `Uncertain` parks the claim and
//! compensates nothing.

use std::sync::Arc;

use tivoli_engine::{Engine, State};
use tivoli_types::config::EconomyConfig;
use tivoli_types::economy::{day_index, ClaimKind, PendingClaim};

use crate::bridge::Settlement;

mod daily;
mod gacha;
mod lottery;
mod raffle;

pub use daily::{CheckinOutcome, CodeClaimOutcome, GrantOutcome, ScoreOutcome};
pub use gacha::DrawOutcome;
pub use lottery::SpinOutcome;
pub use raffle::{EntryOutcome, PayoutOutcome};

pub struct Flows<S: State, B: Settlement> {
    pub(crate) engine: Arc<Engine<S>>,
    pub(crate) bridge: B,
    pub(crate) config: EconomyConfig,
}

impl<S: State, B: Settlement> Flows<S, B> {
    /// The engine must have been constructed with the same day offset as
    /// `config.day_offset_secs`, or quota days and budget-pool days drift
    /// apart.
    pub fn new(engine: Arc<Engine<S>>, bridge: B, config: EconomyConfig) -> Self {
        debug_assert_eq!(engine.day_offset_secs(), config.day_offset_secs);
        Self {
            engine,
            bridge,
            config,
        }
    }

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub(crate) fn day(&self, now: u64) -> u32 {
        day_index(now, self.config.day_offset_secs)
    }
}

/// Stable idempotency hint for a claim's external grant. Derived from the
/// claim id so the initial call and every reconciliation retry present the
/// same identity to the external service.
pub(crate) fn settlement_hint(claim_id: u64, kind: ClaimKind) -> String {
    match kind {
        ClaimKind::LotterySpin => format!("spin-{claim_id}"),
        ClaimKind::RafflePayout => format!("raffle-{claim_id}"),
        _ => format!("claim-{claim_id}"),
    }
}

pub(crate) fn hint_for(claim: &PendingClaim) -> String {
    settlement_hint(claim.id, claim.kind)
}
