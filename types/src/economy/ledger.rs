use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};

use super::{
    read_string, string_encode_size, write_string, LEDGER_WINDOW, MAX_DESCRIPTION_LENGTH,
};

/// Currencies tracked by the ledger. Points are the primary earned/spent
/// currency; shards are the fungible secondary currency minted when a
/// duplicate item is converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Currency {
    Points = 0,
    Shards = 1,
}

impl Write for Currency {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Currency {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Points),
            1 => Ok(Self::Shards),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Currency {
    const SIZE: usize = 1;
}

/// Origin of a balance mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LedgerSource {
    GameReward = 0,
    Checkin = 1,
    GachaDraw = 2,
    DuplicateConversion = 3,
    LotterySpin = 4,
    LotteryPrize = 5,
    RaffleEntry = 6,
    CodeClaim = 7,
    NewUserGrant = 8,
    Refund = 9,
    ManualAdjust = 10,
}

impl Write for LedgerSource {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for LedgerSource {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::GameReward),
            1 => Ok(Self::Checkin),
            2 => Ok(Self::GachaDraw),
            3 => Ok(Self::DuplicateConversion),
            4 => Ok(Self::LotterySpin),
            5 => Ok(Self::LotteryPrize),
            6 => Ok(Self::RaffleEntry),
            7 => Ok(Self::CodeClaim),
            8 => Ok(Self::NewUserGrant),
            9 => Ok(Self::Refund),
            10 => Ok(Self::ManualAdjust),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for LedgerSource {
    const SIZE: usize = 1;
}

/// Current balances for an account. Owned exclusively by the ledger; every
/// mutation appends exactly one [`LedgerEntry`] in the same atomic step.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BalanceState {
    pub points: u64,
    pub shards: u64,
}

impl BalanceState {
    pub fn get(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Points => self.points,
            Currency::Shards => self.shards,
        }
    }

    pub fn set(&mut self, currency: Currency, value: u64) {
        match currency {
            Currency::Points => self.points = value,
            Currency::Shards => self.shards = value,
        }
    }
}

impl Write for BalanceState {
    fn write(&self, writer: &mut impl BufMut) {
        self.points.write(writer);
        self.shards.write(writer);
    }
}

impl Read for BalanceState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let points = u64::read(reader)?;

        // Optional extension (backwards compatible with balances stored before
        // the shard currency existed).
        let shards = if reader.remaining() >= u64::SIZE {
            u64::read(reader)?
        } else {
            0
        };

        Ok(Self { points, shards })
    }
}

impl EncodeSize for BalanceState {
    fn encode_size(&self) -> usize {
        self.points.encode_size() + self.shards.encode_size()
    }
}

/// One immutable balance mutation. `balance_after` is the balance of
/// `currency` after the mutation was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: u64,
    pub delta: i64,
    pub currency: Currency,
    pub source: LedgerSource,
    pub description: String,
    pub balance_after: u64,
    pub created_ts: u64,
}

impl Write for LedgerEntry {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.delta.write(writer);
        self.currency.write(writer);
        self.source.write(writer);
        write_string(&self.description, writer);
        self.balance_after.write(writer);
        self.created_ts.write(writer);
    }
}

impl Read for LedgerEntry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u64::read(reader)?,
            delta: i64::read(reader)?,
            currency: Currency::read(reader)?,
            source: LedgerSource::read(reader)?,
            description: read_string(reader, MAX_DESCRIPTION_LENGTH)?,
            balance_after: u64::read(reader)?,
            created_ts: u64::read(reader)?,
        })
    }
}

impl EncodeSize for LedgerEntry {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.delta.encode_size()
            + self.currency.encode_size()
            + self.source.encode_size()
            + string_encode_size(&self.description)
            + self.balance_after.encode_size()
            + self.created_ts.encode_size()
    }
}

/// Append-only history of an account's balance mutations, retained as a
/// bounded recent window. `next_entry_id` is monotone across trims.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LedgerHistory {
    pub next_entry_id: u64,
    pub entries: Vec<LedgerEntry>,
}

impl LedgerHistory {
    /// Append one entry, assigning its id and trimming the window.
    pub fn append(
        &mut self,
        delta: i64,
        currency: Currency,
        source: LedgerSource,
        description: String,
        balance_after: u64,
        created_ts: u64,
    ) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id = self.next_entry_id.saturating_add(1);
        self.entries.push(LedgerEntry {
            id,
            delta,
            currency,
            source,
            description,
            balance_after,
            created_ts,
        });
        if self.entries.len() > LEDGER_WINDOW {
            let excess = self.entries.len() - LEDGER_WINDOW;
            self.entries.drain(..excess);
        }
        id
    }
}

impl Write for LedgerHistory {
    fn write(&self, writer: &mut impl BufMut) {
        self.next_entry_id.write(writer);
        self.entries.write(writer);
    }
}

impl Read for LedgerHistory {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            next_entry_id: u64::read(reader)?,
            entries: Vec::<LedgerEntry>::read_range(reader, 0..=LEDGER_WINDOW)?,
        })
    }
}

impl EncodeSize for LedgerHistory {
    fn encode_size(&self) -> usize {
        self.next_entry_id.encode_size() + self.entries.encode_size()
    }
}
