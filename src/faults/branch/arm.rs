//! ARM `B`/`BL` recognition
//!
//! Instructions are 32-bit little-endian words; the most significant byte at
//! `address + 3` holds the condition nibble and the opcode bits.

use super::{EncodingVariant, Window};
use crate::error::FaultError;
use crate::faults::FaultKind;

/// Condition nibble of an unconditional ("always") instruction
const CONDITION_ALWAYS: u8 = 0xE0;

fn is_branch(byte: u8) -> bool {
    byte & 0x0E == 0x0A
}

/// Recognize the ARM branch of `kind` at the window address.
///
/// JMP accepts any branch; JBE and JCC only conditional ones.
pub(super) fn decode(
    kind: FaultKind,
    window: &Window,
) -> Result<(u64, EncodingVariant), FaultError> {
    if window.available < 4 {
        return Err(FaultError::OutOfBounds((window.address + 3) as i64));
    }
    let opcode = window.bytes[3];
    let accepted = match kind {
        FaultKind::Jmp => is_branch(opcode),
        _ => is_branch(opcode) && opcode & 0xF0 != CONDITION_ALWAYS,
    };
    if accepted {
        Ok((window.address, EncodingVariant::ArmBranch))
    } else {
        Err(FaultError::UnrecognizedOpcode {
            kind: kind.name(),
            opcode,
        })
    }
}
