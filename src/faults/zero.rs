use super::{write_at, FaultFunctions};
use crate::address::{parse_address, AddressSet};
use crate::config::ExecConfig;
use crate::error::FaultError;
use crate::faults::FaultKind;
use std::io::{Read, Seek, Write};
use std::ops::RangeInclusive;

/// Zero every byte of `span`
fn zero_span<F: Write + Seek>(file: &mut F, span: &AddressSet) -> Result<(), FaultError> {
    write_at(file, span.first(), &vec![0u8; span.len() as usize])
}

/// Set one byte, or every byte of a range, to 0x00
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZeroByte {
    pub span: AddressSet,
}

impl ZeroByte {
    pub fn new(addr: &str) -> Result<Self, FaultError> {
        Ok(Self {
            span: parse_address(addr)?,
        })
    }
}

impl FaultFunctions for ZeroByte {
    fn edited_bytes(&self) -> RangeInclusive<u64> {
        self.span.iter()
    }

    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError> {
        zero_span(file, &self.span)
    }
}

/// Set one word, or a range of whole words, to 0x00
///
/// A single address is widened to `word_length` bytes at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZeroWord {
    pub span: AddressSet,
}

impl ZeroWord {
    /// Creates a new `ZeroWord` fault.
    ///
    /// # Returns
    ///
    /// * `Err(FaultError::MissingConfiguration)` - If no word length is configured.
    /// * `Err(FaultError::MisalignedRange)` - If a range is not a whole number of words.
    pub fn new(config: &ExecConfig, addr: &str) -> Result<Self, FaultError> {
        let addresses = parse_address(addr)?;
        let word_length = config.require_word_length(FaultKind::Z1w)?;

        let span = if addresses.is_single() {
            let first = addresses.first();
            first
                .checked_add(word_length - 1)
                .and_then(|last| AddressSet::range(first, last))
                .ok_or(FaultError::OutOfBounds(first as i64))?
        } else if addresses.len() % word_length == 0 {
            addresses
        } else {
            return Err(FaultError::MisalignedRange {
                kind: "Z1W",
                unit: word_length,
                len: addresses.len(),
            });
        };
        Ok(Self { span })
    }
}

impl FaultFunctions for ZeroWord {
    fn edited_bytes(&self) -> RangeInclusive<u64> {
        self.span.iter()
    }

    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError> {
        zero_span(file, &self.span)
    }
}
