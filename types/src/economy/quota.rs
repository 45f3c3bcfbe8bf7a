use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

use super::SECONDS_PER_DAY;

/// Daily-capped resources. Each (account, resource, day) triple gets its own
/// counter; old days are dead keys trimmed opportunistically on rollover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Resource {
    GamePoints = 0,
    Checkin = 1,
    LotterySpin = 2,
    GachaDraw = 3,
    RaffleEntry = 4,
    CodeClaim = 5,
}

impl Write for Resource {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Resource {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::GamePoints),
            1 => Ok(Self::Checkin),
            2 => Ok(Self::LotterySpin),
            3 => Ok(Self::GachaDraw),
            4 => Ok(Self::RaffleEntry),
            5 => Ok(Self::CodeClaim),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Resource {
    const SIZE: usize = 1;
}

/// Per-account per-resource usage for one local calendar day.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DailyCounter {
    pub used: u64,
}

impl Write for DailyCounter {
    fn write(&self, writer: &mut impl BufMut) {
        self.used.write(writer);
    }
}

impl Read for DailyCounter {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            used: u64::read(reader)?,
        })
    }
}

impl EncodeSize for DailyCounter {
    fn encode_size(&self) -> usize {
        self.used.encode_size()
    }
}

/// Local calendar day index for a unix timestamp. The offset shifts the
/// midnight boundary to the deployment's local timezone.
pub fn day_index(now_secs: u64, day_offset_secs: i32) -> u32 {
    let local = if day_offset_secs >= 0 {
        now_secs.saturating_add(day_offset_secs as u64)
    } else {
        now_secs.saturating_sub(day_offset_secs.unsigned_abs() as u64)
    };
    (local / SECONDS_PER_DAY) as u32
}
