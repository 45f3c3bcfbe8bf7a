//! Persisted state addressing.
//!
//! Every record the engine stores is a [`Value`] variant addressed by a
//! [`Key`] variant. Tags are stable; new variants append new tags and decoded
//! records tolerate optional trailing fields, so a corrupt or unknown record
//! surfaces as a codec error instead of silently reinitialized state.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use crate::economy::{
    read_string, string_encode_size, write_string, BalanceState, ClaimKind, ClaimRegistry,
    DailyCounter, Holdings, IdempotencyRecord, LedgerHistory, PendingClaim, PityCounters, Pool,
    PoolId, Resource, MAX_IDEMPOTENCY_KEY_LENGTH,
};

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Account balances (tag 0)
    Balance(PublicKey),
    /// Bounded recent ledger window per account (tag 1)
    Ledger(PublicKey),
    /// Daily usage counter per account/resource/local-day (tag 2)
    DailyCounter(PublicKey, Resource, u32),
    /// Finite pool capacity (tag 3)
    Pool(PoolId),
    /// Guarantee counters per account (tag 4)
    Pity(PublicKey),
    /// Claim by id (tag 5)
    Claim(u64),
    /// In-flight claim marker per account/kind (tag 6)
    ActiveClaim(PublicKey, ClaimKind),
    /// Claim id allocator and sweep indexes (tag 7)
    ClaimRegistry,
    /// Item holdings per account (tag 8)
    Holdings(PublicKey),
    /// Idempotency record per logical submission (tag 9)
    Idempotency(String),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Balance(pk) => {
                0u8.write(writer);
                pk.write(writer);
            }
            Self::Ledger(pk) => {
                1u8.write(writer);
                pk.write(writer);
            }
            Self::DailyCounter(pk, resource, day) => {
                2u8.write(writer);
                pk.write(writer);
                resource.write(writer);
                day.write(writer);
            }
            Self::Pool(pool) => {
                3u8.write(writer);
                pool.write(writer);
            }
            Self::Pity(pk) => {
                4u8.write(writer);
                pk.write(writer);
            }
            Self::Claim(id) => {
                5u8.write(writer);
                id.write(writer);
            }
            Self::ActiveClaim(pk, kind) => {
                6u8.write(writer);
                pk.write(writer);
                kind.write(writer);
            }
            Self::ClaimRegistry => 7u8.write(writer),
            Self::Holdings(pk) => {
                8u8.write(writer);
                pk.write(writer);
            }
            Self::Idempotency(key) => {
                9u8.write(writer);
                write_string(key, writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Balance(PublicKey::read(reader)?),
            1 => Self::Ledger(PublicKey::read(reader)?),
            2 => Self::DailyCounter(
                PublicKey::read(reader)?,
                Resource::read(reader)?,
                u32::read(reader)?,
            ),
            3 => Self::Pool(PoolId::read(reader)?),
            4 => Self::Pity(PublicKey::read(reader)?),
            5 => Self::Claim(u64::read(reader)?),
            6 => Self::ActiveClaim(PublicKey::read(reader)?, ClaimKind::read(reader)?),
            7 => Self::ClaimRegistry,
            8 => Self::Holdings(PublicKey::read(reader)?),
            9 => Self::Idempotency(read_string(reader, MAX_IDEMPOTENCY_KEY_LENGTH)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Balance(_) => PublicKey::SIZE,
                Self::Ledger(_) => PublicKey::SIZE,
                Self::DailyCounter(_, _, _) => PublicKey::SIZE + Resource::SIZE + u32::SIZE,
                Self::Pool(pool) => pool.encode_size(),
                Self::Pity(_) => PublicKey::SIZE,
                Self::Claim(_) => u64::SIZE,
                Self::ActiveClaim(_, _) => PublicKey::SIZE + ClaimKind::SIZE,
                Self::ClaimRegistry => 0,
                Self::Holdings(_) => PublicKey::SIZE,
                Self::Idempotency(key) => string_encode_size(key),
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    /// Account balances (tag 0)
    Balance(BalanceState),
    /// Bounded recent ledger window (tag 1)
    Ledger(LedgerHistory),
    /// Daily usage counter (tag 2)
    DailyCounter(DailyCounter),
    /// Finite pool capacity (tag 3)
    Pool(Pool),
    /// Guarantee counters (tag 4)
    Pity(PityCounters),
    /// Claim by id (tag 5)
    Claim(PendingClaim),
    /// In-flight claim marker (tag 6)
    ActiveClaim(u64),
    /// Claim id allocator and sweep indexes (tag 7)
    ClaimRegistry(ClaimRegistry),
    /// Item holdings (tag 8)
    Holdings(Holdings),
    /// Idempotency record (tag 9)
    Idempotency(IdempotencyRecord),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Balance(balance) => {
                0u8.write(writer);
                balance.write(writer);
            }
            Self::Ledger(history) => {
                1u8.write(writer);
                history.write(writer);
            }
            Self::DailyCounter(counter) => {
                2u8.write(writer);
                counter.write(writer);
            }
            Self::Pool(pool) => {
                3u8.write(writer);
                pool.write(writer);
            }
            Self::Pity(pity) => {
                4u8.write(writer);
                pity.write(writer);
            }
            Self::Claim(claim) => {
                5u8.write(writer);
                claim.write(writer);
            }
            Self::ActiveClaim(id) => {
                6u8.write(writer);
                id.write(writer);
            }
            Self::ClaimRegistry(registry) => {
                7u8.write(writer);
                registry.write(writer);
            }
            Self::Holdings(holdings) => {
                8u8.write(writer);
                holdings.write(writer);
            }
            Self::Idempotency(record) => {
                9u8.write(writer);
                record.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Balance(BalanceState::read(reader)?),
            1 => Self::Ledger(LedgerHistory::read(reader)?),
            2 => Self::DailyCounter(DailyCounter::read(reader)?),
            3 => Self::Pool(Pool::read(reader)?),
            4 => Self::Pity(PityCounters::read(reader)?),
            5 => Self::Claim(PendingClaim::read(reader)?),
            6 => Self::ActiveClaim(u64::read(reader)?),
            7 => Self::ClaimRegistry(ClaimRegistry::read(reader)?),
            8 => Self::Holdings(Holdings::read(reader)?),
            9 => Self::Idempotency(IdempotencyRecord::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Balance(balance) => balance.encode_size(),
                Self::Ledger(history) => history.encode_size(),
                Self::DailyCounter(counter) => counter.encode_size(),
                Self::Pool(pool) => pool.encode_size(),
                Self::Pity(pity) => pity.encode_size(),
                Self::Claim(claim) => claim.encode_size(),
                Self::ActiveClaim(id) => id.encode_size(),
                Self::ClaimRegistry(registry) => registry.encode_size(),
                Self::Holdings(holdings) => holdings.encode_size(),
                Self::Idempotency(record) => record.encode_size(),
            }
    }
}
