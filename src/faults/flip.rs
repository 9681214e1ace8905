use super::{write_at, BitLocation, FaultFunctions};
use crate::address::{parse_address, parse_int};
use crate::error::FaultError;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::RangeInclusive;

/// Bit flip fault structure
/// address       Byte containing the bit
/// significance  Bit index inside the byte, 0 is the least significant bit
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitFlip {
    pub address: u64,
    pub significance: u8,
}

impl BitFlip {
    /// Creates a new `BitFlip` fault from its `addr significance` arguments.
    ///
    /// # Returns
    ///
    /// * `Err(FaultError::RangeNotSupported)` - If `addr` is a range.
    /// * `Err(FaultError::InvalidSignificance)` - If `significance` is not in `0..=7`.
    pub fn new(addr: &str, significance: &str) -> Result<Self, FaultError> {
        let addresses = parse_address(addr)?;
        if !addresses.is_single() {
            return Err(FaultError::RangeNotSupported("FLP"));
        }
        let significance = parse_int(significance)
            .and_then(|value| u8::try_from(value).ok())
            .filter(|value| *value < 8)
            .ok_or_else(|| FaultError::InvalidSignificance(significance.to_string()))?;
        Ok(Self {
            address: addresses.first(),
            significance,
        })
    }
}

impl FaultFunctions for BitFlip {
    fn edited_bytes(&self) -> RangeInclusive<u64> {
        self.address..=self.address
    }

    fn edited_bits(&self) -> Vec<BitLocation> {
        vec![BitLocation::new(self.address, self.significance)]
    }

    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError> {
        let mut value = [0u8; 1];
        file.seek(SeekFrom::Start(self.address))?;
        file.read_exact(&mut value)?;
        value[0] ^= 1 << self.significance;
        write_at(file, self.address, &value)
    }
}
