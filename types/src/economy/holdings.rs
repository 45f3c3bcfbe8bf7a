use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

use super::MAX_HOLDINGS;

/// Item ids an account owns, kept sorted for cheap duplicate checks.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Holdings {
    pub items: Vec<u16>,
}

impl Holdings {
    pub fn contains(&self, item: u16) -> bool {
        self.items.binary_search(&item).is_ok()
    }

    /// Add an item. Returns false (and leaves holdings unchanged) when the
    /// account already owns it.
    pub fn insert(&mut self, item: u16) -> bool {
        match self.items.binary_search(&item) {
            Ok(_) => false,
            Err(at) => {
                self.items.insert(at, item);
                true
            }
        }
    }
}

impl Write for Holdings {
    fn write(&self, writer: &mut impl BufMut) {
        self.items.write(writer);
    }
}

impl Read for Holdings {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let items = Vec::<u16>::read_range(reader, 0..=MAX_HOLDINGS)?;
        if !items.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(Error::Invalid("Holdings", "items not strictly sorted"));
        }
        Ok(Self { items })
    }
}

impl EncodeSize for Holdings {
    fn encode_size(&self) -> usize {
        self.items.encode_size()
    }
}
