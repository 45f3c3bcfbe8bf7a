use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

/// At-most-once guard record for an externally-replayable submission.
///
/// `Locked` marks an execution in flight; `Done` carries the stored result
/// so replays within the validity window return it without re-executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GuardStatus {
    Locked = 0,
    Done = 1,
}

impl Write for GuardStatus {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GuardStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Locked),
            1 => Ok(Self::Done),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for GuardStatus {
    const SIZE: usize = 1;
}

/// Result stored under a completed idempotency key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredResult {
    /// A quota-clipped credit was granted (possibly zero).
    Granted { amount: u64, balance_after: u64 },
    /// An external settlement completed for the referenced claim.
    Settled { claim_id: u64 },
}

impl Write for StoredResult {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Granted {
                amount,
                balance_after,
            } => {
                0u8.write(writer);
                amount.write(writer);
                balance_after.write(writer);
            }
            Self::Settled { claim_id } => {
                1u8.write(writer);
                claim_id.write(writer);
            }
        }
    }
}

impl Read for StoredResult {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Granted {
                amount: u64::read(reader)?,
                balance_after: u64::read(reader)?,
            }),
            1 => Ok(Self::Settled {
                claim_id: u64::read(reader)?,
            }),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for StoredResult {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Granted {
                amount,
                balance_after,
            } => amount.encode_size() + balance_after.encode_size(),
            Self::Settled { claim_id } => claim_id.encode_size(),
        }
    }
}

/// Persisted idempotency key state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub status: GuardStatus,
    pub expires_ts: u64,
    pub result: Option<StoredResult>,
}

impl IdempotencyRecord {
    pub fn locked(expires_ts: u64) -> Self {
        Self {
            status: GuardStatus::Locked,
            expires_ts,
            result: None,
        }
    }

    pub fn expired(&self, now: u64) -> bool {
        now >= self.expires_ts
    }
}

impl Write for IdempotencyRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.status.write(writer);
        self.expires_ts.write(writer);
        self.result.write(writer);
    }
}

impl Read for IdempotencyRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            status: GuardStatus::read(reader)?,
            expires_ts: u64::read(reader)?,
            result: Option::<StoredResult>::read(reader)?,
        })
    }
}

impl EncodeSize for IdempotencyRecord {
    fn encode_size(&self) -> usize {
        self.status.encode_size() + self.expires_ts.encode_size() + self.result.encode_size()
    }
}
