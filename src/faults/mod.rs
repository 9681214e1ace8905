use crate::config::ExecConfig;
use crate::error::FaultError;
use colored::Color;
use itertools::Itertools;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::{Range, RangeInclusive};

pub mod branch;
pub mod flip;
pub mod nop;
pub mod zero;

pub use branch::{BranchRewrite, EncodingVariant};
pub use flip::BitFlip;
pub use nop::Nop;
pub use zero::{ZeroByte, ZeroWord};

/// Closed set of supported fault models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Flip one bit
    Flp,
    /// Zero bytes
    Z1b,
    /// Zero words
    Z1w,
    /// Replace by no-operation instructions
    Nop,
    /// Redirect an unconditional (x86) or any (ARM) branch
    Jmp,
    /// Redirect a conditional branch
    Jbe,
    /// Redirect a conditional branch, target outside the file only warns
    Jcc,
}

impl FaultKind {
    /// Name to kind registry, in the order shown to the user
    pub const ALL: [FaultKind; 7] = [
        FaultKind::Flp,
        FaultKind::Z1b,
        FaultKind::Z1w,
        FaultKind::Nop,
        FaultKind::Jmp,
        FaultKind::Jbe,
        FaultKind::Jcc,
    ];

    /// Look up a fault kind by its command line name
    pub fn from_name(name: &str) -> Option<FaultKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            FaultKind::Flp => "FLP",
            FaultKind::Z1b => "Z1B",
            FaultKind::Z1w => "Z1W",
            FaultKind::Nop => "NOP",
            FaultKind::Jmp => "JMP",
            FaultKind::Jbe => "JBE",
            FaultKind::Jcc => "JCC",
        }
    }

    /// Number of arguments following the name
    pub fn arg_count(self) -> usize {
        match self {
            FaultKind::Z1b | FaultKind::Z1w | FaultKind::Nop => 1,
            FaultKind::Flp | FaultKind::Jmp | FaultKind::Jbe | FaultKind::Jcc => 2,
        }
    }

    /// One line usage description
    pub fn docs(self) -> &'static str {
        match self {
            FaultKind::Flp => "FLP addr significance \t flip one specific bit",
            FaultKind::Z1b => "Z1B addr \t\t set one byte to 0x0",
            FaultKind::Z1w => "Z1W addr \t\t set one word to 0x0",
            FaultKind::Nop => "NOP addr \t\t nop one address (1 or 2 bytes depending on arch)",
            FaultKind::Jmp => "JMP addr target \t change the jump to point on the target",
            FaultKind::Jbe => {
                "JBE addr target \t change the conditional jump to point on the target"
            }
            FaultKind::Jcc => {
                "JCC addr target \t change the conditional jump to point on the target \
                 (relative near Jcc on x86; B and BL with a condition on ARM)"
            }
        }
    }

    /// Highlight color in the diff view
    pub fn color(self) -> Color {
        match self {
            FaultKind::Flp => Color::TrueColor {
                r: 64,
                g: 224,
                b: 208,
            },
            FaultKind::Z1b => Color::Green,
            FaultKind::Z1w => Color::TrueColor { r: 0, g: 238, b: 0 },
            FaultKind::Nop => Color::Red,
            FaultKind::Jmp => Color::TrueColor {
                r: 255,
                g: 165,
                b: 0,
            },
            FaultKind::Jbe => Color::TrueColor {
                r: 255,
                g: 99,
                b: 71,
            },
            FaultKind::Jcc => Color::TrueColor {
                r: 255,
                g: 215,
                b: 0,
            },
        }
    }
}

/// One bit of the file, the unit of conflict detection
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitLocation {
    pub byte: u64,
    pub bit: u8,
}

impl BitLocation {
    pub fn new(byte: u64, bit: u8) -> Self {
        Self { byte, bit }
    }
}

/// All bits of the bytes in `bytes`
fn bits_of(bytes: impl Iterator<Item = u64>) -> Vec<BitLocation> {
    bytes
        .flat_map(|byte| (0..8).map(move |bit| BitLocation::new(byte, bit)))
        .collect()
}

/// Write `data` to `file` at `offset`
pub(crate) fn write_at<F: Write + Seek>(
    file: &mut F,
    offset: u64,
    data: &[u8],
) -> Result<(), FaultError> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(())
}

/// Behaviour shared by every fault model
pub trait FaultFunctions {
    /// Bytes changed by [`FaultFunctions::apply`], computed without touching any file
    fn edited_bytes(&self) -> RangeInclusive<u64>;

    /// Bits changed by [`FaultFunctions::apply`]
    fn edited_bits(&self) -> Vec<BitLocation> {
        bits_of(self.edited_bytes())
    }

    /// Mutate the opened output file
    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError>;
}

/// A fully resolved and validated fault
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaultModel {
    Flip(BitFlip),
    ZeroByte(ZeroByte),
    ZeroWord(ZeroWord),
    Nop(Nop),
    Branch(BranchRewrite),
}

impl FaultModel {
    /// Parse and validate the arguments of a fault model.
    ///
    /// # Arguments
    ///
    /// * `kind` - The fault model to build.
    /// * `config` - Run configuration (architecture, word length, input file).
    /// * `args` - Raw argument tokens, exactly `kind.arg_count()` of them.
    ///
    /// # Returns
    ///
    /// * `Ok(FaultModel)` - The resolved fault.
    /// * `Err(FaultError)` - The first precondition the arguments violate.
    pub fn new(kind: FaultKind, config: &ExecConfig, args: &[String]) -> Result<Self, FaultError> {
        if args.len() != kind.arg_count() {
            return Err(FaultError::InvalidArgumentCount {
                kind: kind.name(),
                expected: kind.arg_count(),
                found: args.len(),
            });
        }
        let model = match kind {
            FaultKind::Flp => FaultModel::Flip(BitFlip::new(&args[0], &args[1])?),
            FaultKind::Z1b => FaultModel::ZeroByte(ZeroByte::new(&args[0])?),
            FaultKind::Z1w => FaultModel::ZeroWord(ZeroWord::new(config, &args[0])?),
            FaultKind::Nop => FaultModel::Nop(Nop::new(config, &args[0])?),
            FaultKind::Jmp | FaultKind::Jbe | FaultKind::Jcc => {
                FaultModel::Branch(BranchRewrite::new(kind, config, &args[0], &args[1])?)
            }
        };
        Ok(model)
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            FaultModel::Flip(_) => FaultKind::Flp,
            FaultModel::ZeroByte(_) => FaultKind::Z1b,
            FaultModel::ZeroWord(_) => FaultKind::Z1w,
            FaultModel::Nop(_) => FaultKind::Nop,
            FaultModel::Branch(branch) => branch.kind(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Contiguous byte ranges touched by this fault, in increasing order
    pub fn edited_byte_ranges(&self) -> Vec<Range<u64>> {
        self.edited_bits()
            .into_iter()
            .map(|location| location.byte)
            .sorted()
            .dedup()
            .map(|byte| byte..byte + 1)
            .coalesce(|a, b| {
                if a.end == b.start {
                    Ok(a.start..b.end)
                } else {
                    Err((a, b))
                }
            })
            .collect()
    }
}

impl FaultFunctions for FaultModel {
    fn edited_bytes(&self) -> RangeInclusive<u64> {
        match self {
            FaultModel::Flip(fault) => fault.edited_bytes(),
            FaultModel::ZeroByte(fault) => fault.edited_bytes(),
            FaultModel::ZeroWord(fault) => fault.edited_bytes(),
            FaultModel::Nop(fault) => fault.edited_bytes(),
            FaultModel::Branch(fault) => fault.edited_bytes(),
        }
    }

    fn edited_bits(&self) -> Vec<BitLocation> {
        match self {
            FaultModel::Flip(fault) => fault.edited_bits(),
            FaultModel::ZeroByte(fault) => fault.edited_bits(),
            FaultModel::ZeroWord(fault) => fault.edited_bits(),
            FaultModel::Nop(fault) => fault.edited_bits(),
            FaultModel::Branch(fault) => fault.edited_bits(),
        }
    }

    fn apply<F: Read + Write + Seek>(&self, file: &mut F) -> Result<(), FaultError> {
        match self {
            FaultModel::Flip(fault) => fault.apply(file),
            FaultModel::ZeroByte(fault) => fault.apply(file),
            FaultModel::ZeroWord(fault) => fault.apply(file),
            FaultModel::Nop(fault) => fault.apply(file),
            FaultModel::Branch(fault) => fault.apply(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        for kind in FaultKind::ALL {
            assert_eq!(FaultKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(FaultKind::from_name("nop"), None);
        assert_eq!(FaultKind::from_name("0x10"), None);
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let config = ExecConfig::new("in", "out", None, None).unwrap();
        let err = FaultModel::new(FaultKind::Flp, &config, &["0x1".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            FaultError::InvalidArgumentCount {
                kind: "FLP",
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn byte_ranges_are_coalesced() {
        let config = ExecConfig::new("in", "out", None, Some(4)).unwrap();
        let model = FaultModel::new(FaultKind::Z1w, &config, &["0x10".to_string()]).unwrap();
        assert_eq!(model.edited_byte_ranges(), vec![0x10..0x14]);
        assert_eq!(model.edited_bits().len(), 32);
    }
}
