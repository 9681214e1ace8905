//! # Branch target rewriting
//!
//! JMP, JBE and JCC faults redirect an existing relative branch to another
//! location of the file. Only the displacement field of the instruction is
//! rewritten; the opcode bytes and the instruction length stay untouched.
//!
//! Decoding looks at a small window of the original input file around the
//! requested address and matches it against the ordered rule tables of
//! [`x86`] and [`arm`].

mod arm;
mod x86;

use super::{write_at, FaultFunctions, FaultKind};
use crate::address::{parse_address, parse_int};
use crate::config::{Architecture, ExecConfig};
use crate::error::FaultError;
use log::{debug, warn};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::RangeInclusive;
use std::path::Path;

/// Encoding of a recognized relative branch.
///
/// Describes where the displacement operand lives inside the instruction, how
/// wide it is and how the processor turns it into an absolute target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingVariant {
    /// `opcode rel8` (Jcc, JECXZ, JMP short)
    ShortRel8,
    /// Operand-size prefixed `[0x66] opcode rel16`, prefix counted in `opcode_len`
    NearRel16 { opcode_len: u64 },
    /// `opcode rel32`
    NearRel32 { opcode_len: u64 },
    /// ARM `B`/`BL`, signed 24-bit word offset in the low three bytes
    ArmBranch,
}

impl EncodingVariant {
    /// Number of opcode bytes (including prefixes) of the instruction
    pub fn opcode_len(self) -> u64 {
        match self {
            EncodingVariant::ShortRel8 | EncodingVariant::ArmBranch => 1,
            EncodingVariant::NearRel16 { opcode_len } | EncodingVariant::NearRel32 { opcode_len } => {
                opcode_len
            }
        }
    }

    /// Offset of the displacement operand from the start of the instruction
    pub fn operand_offset(self) -> u64 {
        match self {
            EncodingVariant::ArmBranch => 0,
            _ => self.opcode_len(),
        }
    }

    /// Width of the displacement operand in bytes
    pub fn operand_width(self) -> u64 {
        match self {
            EncodingVariant::ShortRel8 => 1,
            EncodingVariant::NearRel16 { .. } => 2,
            EncodingVariant::NearRel32 { .. } => 4,
            EncodingVariant::ArmBranch => 3,
        }
    }

    /// Total instruction length in bytes
    pub fn length(self) -> u64 {
        match self {
            EncodingVariant::ArmBranch => 4,
            _ => self.opcode_len() + self.operand_width(),
        }
    }

    /// Number of significant bits of the byte displacement
    fn displacement_bits(self) -> u32 {
        match self {
            EncodingVariant::ShortRel8 => 8,
            EncodingVariant::NearRel16 { .. } => 16,
            EncodingVariant::NearRel32 { .. } => 32,
            EncodingVariant::ArmBranch => 26,
        }
    }

    /// Byte displacement reaching `target` from an instruction at `start`.
    ///
    /// x86 displacements are relative to the next instruction, ARM ones to the
    /// instruction address plus 8 (pipeline offset).
    /// Computed on `i128`, any `u64` start and `i64` target fit.
    pub fn displacement(self, start: u64, target: i64) -> i128 {
        let base = match self {
            EncodingVariant::ArmBranch => i128::from(start) + 8,
            _ => i128::from(start) + i128::from(self.length()),
        };
        i128::from(target) - base
    }

    /// Displacement reaching `target`, checked against the operand range
    pub fn resolve(self, start: u64, target: i64) -> Result<i64, FaultError> {
        let displacement = self.displacement(start, target);
        let limit = 1i128 << (self.displacement_bits() - 1);
        if (-limit..limit).contains(&displacement) {
            Ok(displacement as i64)
        } else {
            let reported = displacement.clamp(i128::from(i64::MIN), i128::from(i64::MAX));
            Err(FaultError::DisplacementOutOfRange(reported as i64))
        }
    }

    /// Little-endian operand bytes for a resolved displacement
    pub fn encode(self, displacement: i64) -> Vec<u8> {
        let value = match self {
            EncodingVariant::ArmBranch => displacement >> 2,
            _ => displacement,
        };
        value.to_le_bytes()[..self.operand_width() as usize].to_vec()
    }
}

/// Bytes of the original input around the branch address
///
/// Bytes past the end of the file read as 0x00; `available` counts the ones
/// really present from `address` on.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Window {
    address: u64,
    prev: u8,
    bytes: [u8; 4],
    available: usize,
}

impl Window {
    /// Read the window from the input file.
    ///
    /// The byte preceding address 0 reads as 0x00.
    fn read(path: &Path, address: u64) -> Result<Self, FaultError> {
        let lookback = address.min(1);
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(address - lookback))?;
        let mut data = Vec::with_capacity(5);
        file.take(lookback + 4).read_to_end(&mut data)?;

        let prev = match lookback {
            1 => data.first().copied().unwrap_or(0),
            _ => 0,
        };
        let data = data.get(lookback as usize..).unwrap_or_default();
        if data.is_empty() {
            return Err(FaultError::OutOfBounds(address as i64));
        }

        let mut bytes = [0u8; 4];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            address,
            prev,
            bytes,
            available: data.len(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(address: u64, prev: u8, data: &[u8]) -> Self {
        let mut bytes = [0u8; 4];
        let available = data.len().min(4);
        bytes[..available].copy_from_slice(&data[..available]);
        Self {
            address,
            prev,
            bytes,
            available,
        }
    }
}

/// Branch rewrite fault structure
/// kind          JMP, JBE or JCC
/// start         First byte of the instruction (prefix included)
/// variant       Recognized encoding
/// displacement  New displacement reaching the requested target
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchRewrite {
    kind: FaultKind,
    pub start: u64,
    pub variant: EncodingVariant,
    pub displacement: i64,
    pub target: i64,
    target_outside_file: bool,
}

impl BranchRewrite {
    /// Creates a new `BranchRewrite` fault by decoding the branch at `addr`.
    ///
    /// # Arguments
    ///
    /// * `kind` - One of JMP, JBE or JCC, selects the accepted opcodes.
    /// * `config` - Run configuration, provides the architecture and input file.
    /// * `addr` - Address of the branch (a single offset).
    /// * `target` - Absolute file offset the branch shall reach.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The resolved rewrite.
    /// * `Err(FaultError)` - If the address holds no supported branch of this
    ///   kind or the target cannot be encoded.
    ///
    /// # Note
    ///
    /// A target outside the input file is fatal for JMP and JBE but only
    /// logs a warning for JCC.
    pub fn new(
        kind: FaultKind,
        config: &ExecConfig,
        addr: &str,
        target: &str,
    ) -> Result<Self, FaultError> {
        let addresses = parse_address(addr)?;
        if !addresses.is_single() {
            return Err(FaultError::RangeNotSupported(kind.name()));
        }
        let arch = config.require_arch(kind)?;
        let target = parse_int(target).ok_or_else(|| FaultError::InvalidTarget {
            kind: kind.name(),
            token: target.to_string(),
        })?;

        let size = config.input_size()?;
        let target_outside_file = target < 0 || target as u64 >= size;
        if target_outside_file {
            match kind {
                FaultKind::Jcc => warn!("Target outside the file : {:#x}", target),
                _ => return Err(FaultError::TargetOutsideFile(target)),
            }
        }

        let window = Window::read(config.infile(), addresses.first())?;
        let (start, variant) = decode(kind, arch, &window)?;
        let displacement = variant.resolve(start, target)?;
        debug!(
            "{} at 0x{:X}: {:?}, displacement {}",
            kind.name(),
            start,
            variant,
            displacement
        );

        Ok(Self {
            kind,
            start,
            variant,
            displacement,
            target,
            target_outside_file,
        })
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// `true` if the target lies outside the input file (JCC only, others fail)
    pub fn target_outside_file(&self) -> bool {
        self.target_outside_file
    }

    /// File offset of the displacement operand
    pub fn operand_address(&self) -> u64 {
        self.start + self.variant.operand_offset()
    }
}

/// Find the instruction start and encoding of the branch in `window`.
///
/// On ARM an instruction that only matches the x86 tables is reported as an
/// architecture mismatch instead of an unknown opcode.
fn decode(
    kind: FaultKind,
    arch: Architecture,
    window: &Window,
) -> Result<(u64, EncodingVariant), FaultError> {
    match arch {
        Architecture::X86 => x86::decode(kind, window),
        Architecture::Arm => arm::decode(kind, window).or_else(|err| {
            match x86::decode(kind, window) {
                Ok(_) => Err(FaultError::ArchitectureMismatch {
                    opcode: window.bytes[0],
                }),
                Err(_) => Err(err),
            }
        }),
    }
}

impl FaultFunctions for BranchRewrite {
    fn edited_bytes(&self) -> RangeInclusive<u64> {
        let operand = self.operand_address();
        operand..=operand + self.variant.operand_width() - 1
    }

    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError> {
        write_at(
            file,
            self.operand_address(),
            &self.variant.encode(self.displacement),
        )
    }
}
