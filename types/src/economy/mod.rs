//! Economy domain types.
//!
//! Defines balance/ledger/quota/pool/claim/pity state and constants used by the
//! engine and settlement layers.

mod claim;
mod codec;
mod constants;
mod guard;
mod holdings;
mod ledger;
mod pity;
mod pool;
mod quota;

pub use claim::*;
pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use guard::*;
pub use holdings::*;
pub use ledger::*;
pub use pity::*;
pub use pool::*;
pub use quota::*;

#[cfg(test)]
mod tests;
