/// Maximum length of a ledger entry description.
pub const MAX_DESCRIPTION_LENGTH: usize = 96;

/// Maximum length of an idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 64;

/// Number of recent ledger entries retained per account. Older entries are
/// trimmed; `next_entry_id` keeps the full history countable.
pub const LEDGER_WINDOW: usize = 100;

/// Maximum number of distinct items an account can hold.
pub const MAX_HOLDINGS: usize = 1024;

/// Codec bound for the open/uncertain claim lists.
pub const MAX_TRACKED_CLAIMS: usize = 65_536;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Default validity window for a completed idempotency record.
pub const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 24 * 60 * 60;

/// Default age after which a claim still `Pending` is considered stuck and
/// eligible for the recovery sweep.
pub const DEFAULT_STUCK_CLAIM_SECS: u64 = 10 * 60;
