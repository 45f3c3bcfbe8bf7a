use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

/// Gacha outcome tiers, ascending. Common carries no guarantee counter.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tier {
    Common = 0,
    Rare = 1,
    Epic = 2,
    Legendary = 3,
}

impl Write for Tier {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Tier {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Common),
            1 => Ok(Self::Rare),
            2 => Ok(Self::Epic),
            3 => Ok(Self::Legendary),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Tier {
    const SIZE: usize = 1;
}

/// Per-account guarantee counters, one per tier with a pity dimension.
/// Every draw bumps all counters; producing tier T resets T and every lower
/// tier and leaves higher tiers untouched.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PityCounters {
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
}

impl PityCounters {
    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Common => 0,
            Tier::Rare => self.rare,
            Tier::Epic => self.epic,
            Tier::Legendary => self.legendary,
        }
    }

    /// One draw happened: every counter advances.
    pub fn bump(&mut self) {
        self.rare = self.rare.saturating_add(1);
        self.epic = self.epic.saturating_add(1);
        self.legendary = self.legendary.saturating_add(1);
    }

    /// Undo exactly one [`Self::bump`] (reservation rollback).
    pub fn revert_bump(&mut self) {
        self.rare = self.rare.saturating_sub(1);
        self.epic = self.epic.saturating_sub(1);
        self.legendary = self.legendary.saturating_sub(1);
    }

    /// Tier `produced` came out of a draw: reset its counter and every lower
    /// one. Higher-tier counters keep accumulating.
    pub fn reset_for(&mut self, produced: Tier) {
        if produced >= Tier::Rare {
            self.rare = 0;
        }
        if produced >= Tier::Epic {
            self.epic = 0;
        }
        if produced >= Tier::Legendary {
            self.legendary = 0;
        }
    }
}

impl Write for PityCounters {
    fn write(&self, writer: &mut impl BufMut) {
        self.rare.write(writer);
        self.epic.write(writer);
        self.legendary.write(writer);
    }
}

impl Read for PityCounters {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            rare: u32::read(reader)?,
            epic: u32::read(reader)?,
            legendary: u32::read(reader)?,
        })
    }
}

impl EncodeSize for PityCounters {
    fn encode_size(&self) -> usize {
        self.rare.encode_size() + self.epic.encode_size() + self.legendary.encode_size()
    }
}
