//! Tivoli engine: the atomic resource reservation and ledger layer.
//!
//! Every balance, quota, pool, pity and claim mutation happens inside one
//! atomic procedure: a single lock-hold over the shared [`State`], staged
//! through a [`Layer`] overlay and applied as one batch. Higher-level flows
//! compose procedures (reserve → decide → finalize/rollback) and rely on
//! claim state for cross-request coordination; see the settlement crate.
//!
//! ## Invariants the procedures maintain
//! - Balances never go negative; every mutation appends exactly one ledger
//!   entry in the same batch.
//! - Daily grants never exceed their cap, regardless of interleaving.
//! - `reserved_or_consumed <= total_capacity` for every pool.
//! - Rollback is idempotent and never touches an `Uncertain` claim.

mod engine;
mod layer;
mod state;

pub mod decide;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod protocol_tests;

pub use engine::Engine;
pub use layer::{Layer, ReserveRequest};
pub use state::{Adb, State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
