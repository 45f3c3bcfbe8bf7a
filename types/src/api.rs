//! Structured operation outcomes.
//!
//! Atomic procedures report business rejections as values, not errors: a
//! quota miss or an exhausted pool is an expected outcome the caller must
//! branch on, while hard errors (store unreachable, corrupt record) propagate
//! separately.

use thiserror::Error;

use crate::economy::{LedgerSource, PityCounters, Tier};

/// Why an operation was refused. Every variant is local and expected; none
/// implies a partial effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("pool exhausted")]
    PoolExhausted,
    #[error("already claimed")]
    AlreadyClaimed,
    #[error("a claim is already in flight")]
    Pending,
    #[error("not eligible")]
    NotEligible,
    #[error("claim not found")]
    ClaimNotFound,
    #[error("claim is not pending")]
    ClaimNotPending,
    #[error("submission already in flight or completed")]
    GuardHeld,
}

/// Result of a ledger mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerOutcome {
    Applied { entry_id: u64, balance_after: u64 },
    Rejected(Rejection),
}

/// Result of a quota-clipped grant. `granted` may be zero (the cap was
/// already reached); a zero grant writes no ledger entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantResult {
    pub granted: u64,
    pub used_today: u64,
    pub balance_after: u64,
}

/// Result of a reservation attempt. `pity` carries the counters *after* the
/// reservation bumped them, for the decide step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved {
        claim_id: u64,
        pity: Option<PityCounters>,
    },
    Rejected(Rejection),
}

/// The concrete result the decide step chose, to be committed by finalize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payout {
    /// Nothing won; the claim still settles.
    None,
    /// Credit points internally.
    Points { amount: u64, source: LedgerSource },
    /// Add an item to holdings (or convert a duplicate to shards).
    Item { item_id: u16, tier: Tier },
    /// Value was granted by the external service; nothing to credit locally.
    External { amount: u64 },
}

/// Whether finalize keeps the reserved slot consumed or returns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotDisposition {
    Consume,
    Return,
}

/// Everything finalize needs to commit a decided outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizeAction {
    pub payout: Payout,
    pub slot: SlotDisposition,
    /// Shards to mint when the payout item turns out to be a duplicate
    /// (the caller resolves the tier's conversion rate from the catalog).
    pub duplicate_conversion: u64,
}

/// Result of committing a claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized {
        /// The account already held the produced item.
        duplicate: bool,
        /// Shards credited in place of the duplicate.
        conversion: u64,
        /// Points balance after any internal payout.
        balance_after: Option<u64>,
    },
    Rejected(Rejection),
}

/// Result of a rollback. Rolling back a settled or already-rolled-back claim
/// is a no-op, reported distinctly so callers can tell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RollbackOutcome {
    RolledBack,
    AlreadySettled,
    Rejected(Rejection),
}

/// Classification of an external settlement call. `Uncertain` is the
/// load-bearing variant: the external system may or may not have applied the
/// grant, so no compensation may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleOutcome {
    Success,
    Failure,
    Uncertain,
}
