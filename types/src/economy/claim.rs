use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use super::{PoolId, Resource, MAX_TRACKED_CLAIMS};

/// What a claim is for. Doubles as the per-account in-flight namespace: one
/// pending claim per (account, kind) at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ClaimKind {
    GachaDraw = 0,
    LotterySpin = 1,
    Checkin = 2,
    CodeClaim = 3,
    RafflePayout = 4,
    NewUserGrant = 5,
    RaffleEntry = 6,
}

impl Write for ClaimKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for ClaimKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::GachaDraw),
            1 => Ok(Self::LotterySpin),
            2 => Ok(Self::Checkin),
            3 => Ok(Self::CodeClaim),
            4 => Ok(Self::RafflePayout),
            5 => Ok(Self::NewUserGrant),
            6 => Ok(Self::RaffleEntry),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for ClaimKind {
    const SIZE: usize = 1;
}

/// Lifecycle of a claim. Terminal once it leaves `Pending`, except
/// `Uncertain`, which reconciliation may later confirm to `Success`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ClaimStatus {
    Pending = 0,
    Success = 1,
    Failure = 2,
    Uncertain = 3,
}

impl Write for ClaimStatus {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for ClaimStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Success),
            2 => Ok(Self::Failure),
            3 => Ok(Self::Uncertain),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for ClaimStatus {
    const SIZE: usize = 1;
}

/// A provisional hold against a pool, pending a final outcome.
///
/// `wagered` is the points debit taken at reservation time (refunded on
/// rollback). `pity_bumped` records whether the reservation advanced the
/// account's guarantee counters, and `counted_resource` which daily counter
/// it consumed, so rollback can return the account to its pre-reservation
/// state. `settled_ts` is 0 until the claim reaches a settled status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingClaim {
    pub id: u64,
    pub account: PublicKey,
    pub pool: Option<PoolId>,
    pub kind: ClaimKind,
    pub status: ClaimStatus,
    pub wagered: u64,
    pub attempts: u32,
    pub created_ts: u64,
    pub settled_ts: u64,
    pub pity_bumped: bool,
    pub counted_resource: Option<Resource>,
    /// Amount submitted to the external crediting service, recorded when the
    /// claim parks `Uncertain` so reconciliation can retry the same grant.
    pub external_amount: u64,
}

impl Write for PendingClaim {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.account.write(writer);
        self.pool.write(writer);
        self.kind.write(writer);
        self.status.write(writer);
        self.wagered.write(writer);
        self.attempts.write(writer);
        self.created_ts.write(writer);
        self.settled_ts.write(writer);
        self.pity_bumped.write(writer);
        self.counted_resource.write(writer);
        self.external_amount.write(writer);
    }
}

impl Read for PendingClaim {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = u64::read(reader)?;
        let account = PublicKey::read(reader)?;
        let pool = Option::<PoolId>::read(reader)?;
        let kind = ClaimKind::read(reader)?;
        let status = ClaimStatus::read(reader)?;
        let wagered = u64::read(reader)?;
        let attempts = u32::read(reader)?;
        let created_ts = u64::read(reader)?;
        let settled_ts = u64::read(reader)?;

        // Optional extensions (claims stored before pity/quota tracking landed).
        let pity_bumped = if reader.remaining() > 0 {
            bool::read(reader)?
        } else {
            false
        };
        let counted_resource = if reader.remaining() > 0 {
            Option::<Resource>::read(reader)?
        } else {
            None
        };
        let external_amount = if reader.remaining() >= u64::SIZE {
            u64::read(reader)?
        } else {
            0
        };

        Ok(Self {
            id,
            account,
            pool,
            kind,
            status,
            wagered,
            attempts,
            created_ts,
            settled_ts,
            pity_bumped,
            counted_resource,
            external_amount,
        })
    }
}

impl EncodeSize for PendingClaim {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.account.encode_size()
            + self.pool.encode_size()
            + self.kind.encode_size()
            + self.status.encode_size()
            + self.wagered.encode_size()
            + self.attempts.encode_size()
            + self.created_ts.encode_size()
            + self.settled_ts.encode_size()
            + self.pity_bumped.encode_size()
            + self.counted_resource.encode_size()
            + self.external_amount.encode_size()
    }
}

/// Claim id allocator plus the open/uncertain indexes the recovery sweep
/// walks (the store has no scan primitive).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ClaimRegistry {
    pub next_claim_id: u64,
    pub open: Vec<u64>,
    pub uncertain: Vec<u64>,
}

impl ClaimRegistry {
    pub fn allocate(&mut self) -> u64 {
        let id = self.next_claim_id;
        self.next_claim_id = self.next_claim_id.saturating_add(1);
        self.open.push(id);
        id
    }

    pub fn close(&mut self, id: u64) {
        self.open.retain(|open| *open != id);
    }

    pub fn park_uncertain(&mut self, id: u64) {
        self.close(id);
        if !self.uncertain.contains(&id) {
            self.uncertain.push(id);
        }
    }

    pub fn resolve_uncertain(&mut self, id: u64) {
        self.uncertain.retain(|parked| *parked != id);
    }
}

impl Write for ClaimRegistry {
    fn write(&self, writer: &mut impl BufMut) {
        self.next_claim_id.write(writer);
        self.open.write(writer);
        self.uncertain.write(writer);
    }
}

impl Read for ClaimRegistry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            next_claim_id: u64::read(reader)?,
            open: Vec::<u64>::read_range(reader, 0..=MAX_TRACKED_CLAIMS)?,
            uncertain: Vec::<u64>::read_range(reader, 0..=MAX_TRACKED_CLAIMS)?,
        })
    }
}

impl EncodeSize for ClaimRegistry {
    fn encode_size(&self) -> usize {
        self.next_claim_id.encode_size()
            + self.open.encode_size()
            + self.uncertain.encode_size()
    }
}
