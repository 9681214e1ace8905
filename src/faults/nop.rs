use super::{write_at, FaultFunctions, FaultKind};
use crate::address::{parse_address, AddressSet};
use crate::config::{Architecture, ExecConfig};
use crate::error::FaultError;
use std::io::{Read, Seek, Write};
use std::ops::RangeInclusive;

const X86_NOP: u8 = 0x90;
const T1_NOP: [u8; 2] = [0x00, 0xBF];

/// No-operation fault structure
/// span  Bytes overwritten with no-op instructions
/// arch  Selects the no-op encoding (0x90 on x86, Thumb `nop` on ARM)
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nop {
    pub span: AddressSet,
    pub arch: Architecture,
}

impl Nop {
    /// Creates a new `Nop` fault.
    ///
    /// On ARM a single address covers the two bytes of one Thumb `nop`, and a
    /// range must have an even length.
    pub fn new(config: &ExecConfig, addr: &str) -> Result<Self, FaultError> {
        let addresses = parse_address(addr)?;
        let arch = config.require_arch(FaultKind::Nop)?;

        let span = match arch {
            Architecture::X86 => addresses,
            Architecture::Arm if addresses.is_single() => {
                let first = addresses.first();
                first
                    .checked_add(1)
                    .and_then(|last| AddressSet::range(first, last))
                    .ok_or(FaultError::OutOfBounds(first as i64))?
            }
            Architecture::Arm if addresses.len() % 2 == 0 => addresses,
            Architecture::Arm => {
                return Err(FaultError::MisalignedRange {
                    kind: "NOP",
                    unit: 2,
                    len: addresses.len(),
                })
            }
        };
        Ok(Self { span, arch })
    }

    /// Bytes written over the span
    fn patch(&self) -> Vec<u8> {
        match self.arch {
            Architecture::X86 => vec![X86_NOP; self.span.len() as usize],
            Architecture::Arm => T1_NOP.repeat(self.span.len() as usize / 2),
        }
    }
}

impl FaultFunctions for Nop {
    fn edited_bytes(&self) -> RangeInclusive<u64> {
        self.span.iter()
    }

    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError> {
        write_at(file, self.span.first(), &self.patch())
    }
}
