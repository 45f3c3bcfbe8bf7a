pub mod api;
pub mod config;
pub mod economy;
pub mod state;

pub use api::{
    FinalizeAction, FinalizeOutcome, GrantResult, LedgerOutcome, Payout, Rejection,
    ReserveOutcome, RollbackOutcome, SettleOutcome, SlotDisposition,
};
pub use state::{Key, Value};

/// Stable account identity supplied by the auth layer. The core never
/// authenticates; it only authorizes by account identity.
pub type AccountId = commonware_cryptography::ed25519::PublicKey;
