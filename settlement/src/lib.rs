//! Tivoli settlement layer.
//!
//! Sits between the engine's atomic procedures and the outside world: the
//! [`bridge`] wraps the external account-crediting service behind a bounded
//! timeout and a three-way outcome classification, the [`flows`] wire
//! reserve → decide → settle → finalize/rollback for each product action,
//! and [`reconcile`] owns the recovery sweep for stuck and uncertain claims.
//!
//! The one rule everything here defends: a definitive external failure is
//! compensated in full, an uncertain one is compensated not at all.

pub mod bridge;
pub mod flows;
pub mod reconcile;

pub use bridge::{BridgeError, HttpSettlement, Settlement};
pub use flows::{
    CheckinOutcome, CodeClaimOutcome, DrawOutcome, EntryOutcome, Flows, GrantOutcome,
    PayoutOutcome, ScoreOutcome, SpinOutcome,
};
pub use reconcile::{ReconcileReport, SweepReport};
