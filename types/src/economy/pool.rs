use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error as ThisError;

/// Identity of a finite resource pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolId {
    /// Inventory of one redemption-code batch.
    CodeBatch(u32),
    /// Direct-credit budget for one local calendar day.
    DailyCredit(u32),
    /// One-shot new-user grant slot for a single account.
    NewUserGrant(PublicKey),
    /// Prize inventory of one raffle.
    Raffle(u32),
}

impl Write for PoolId {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::CodeBatch(batch) => {
                0u8.write(writer);
                batch.write(writer);
            }
            Self::DailyCredit(day) => {
                1u8.write(writer);
                day.write(writer);
            }
            Self::NewUserGrant(pk) => {
                2u8.write(writer);
                pk.write(writer);
            }
            Self::Raffle(id) => {
                3u8.write(writer);
                id.write(writer);
            }
        }
    }
}

impl Read for PoolId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::CodeBatch(u32::read(reader)?)),
            1 => Ok(Self::DailyCredit(u32::read(reader)?)),
            2 => Ok(Self::NewUserGrant(PublicKey::read(reader)?)),
            3 => Ok(Self::Raffle(u32::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for PoolId {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::CodeBatch(_) => u32::SIZE,
                Self::DailyCredit(_) => u32::SIZE,
                Self::NewUserGrant(_) => PublicKey::SIZE,
                Self::Raffle(_) => u32::SIZE,
            }
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PoolInvariantError {
    #[error("pool over-reserved (capacity={capacity}, reserved={reserved})")]
    OverReserved { capacity: u64, reserved: u64 },
}

/// A finite, shared quantity of a resource. `available` is derived and the
/// invariant `reserved_or_consumed <= total_capacity` holds across every
/// reserve/finalize/rollback.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Pool {
    pub total_capacity: u64,
    pub reserved_or_consumed: u64,
}

impl Pool {
    pub fn new(total_capacity: u64) -> Self {
        Self {
            total_capacity,
            reserved_or_consumed: 0,
        }
    }

    pub fn available(&self) -> u64 {
        self.total_capacity.saturating_sub(self.reserved_or_consumed)
    }

    /// Take one slot. Returns false when the pool is exhausted.
    pub fn reserve_one(&mut self) -> bool {
        if self.reserved_or_consumed >= self.total_capacity {
            return false;
        }
        self.reserved_or_consumed += 1;
        true
    }

    /// Return one previously-reserved slot.
    pub fn release_one(&mut self) {
        self.reserved_or_consumed = self.reserved_or_consumed.saturating_sub(1);
    }

    pub fn validate_invariants(&self) -> Result<(), PoolInvariantError> {
        if self.reserved_or_consumed > self.total_capacity {
            return Err(PoolInvariantError::OverReserved {
                capacity: self.total_capacity,
                reserved: self.reserved_or_consumed,
            });
        }
        Ok(())
    }
}

impl Write for Pool {
    fn write(&self, writer: &mut impl BufMut) {
        self.total_capacity.write(writer);
        self.reserved_or_consumed.write(writer);
    }
}

impl Read for Pool {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            total_capacity: u64::read(reader)?,
            reserved_or_consumed: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Pool {
    fn encode_size(&self) -> usize {
        self.total_capacity.encode_size() + self.reserved_or_consumed.encode_size()
    }
}
