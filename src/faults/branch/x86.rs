//! x86 relative branch recognition
//!
//! The rules are evaluated top to bottom and the first one whose kinds and
//! predicate match decides the encoding.

use super::{EncodingVariant, Window};
use crate::error::FaultError;
use crate::faults::FaultKind;

const OPERAND_SIZE_PREFIX: u8 = 0x66;

const CONDITIONAL: &[FaultKind] = &[FaultKind::Jbe, FaultKind::Jcc];
const UNCONDITIONAL: &[FaultKind] = &[FaultKind::Jmp];

/// Instruction start relative to the requested address, and its encoding
type Resolution = (u64, EncodingVariant);

struct Rule {
    kinds: &'static [FaultKind],
    matches: fn(&Window) -> bool,
    resolve: fn(&Window) -> Resolution,
}

const RULES: [Rule; 6] = [
    // Jcc rel8 / JECXZ rel8
    Rule {
        kinds: CONDITIONAL,
        matches: is_short_jcc,
        resolve: short,
    },
    // JMP rel8
    Rule {
        kinds: UNCONDITIONAL,
        matches: is_short_jmp,
        resolve: short,
    },
    // 0F 8x rel32, or rel16 when the address skipped a preceding 0x66
    Rule {
        kinds: CONDITIONAL,
        matches: is_near_jcc,
        resolve: near_jcc,
    },
    // E9 rel32, or rel16 when the address skipped a preceding 0x66
    Rule {
        kinds: UNCONDITIONAL,
        matches: is_near_jmp,
        resolve: near_jmp,
    },
    // 66 0F 8x rel16
    Rule {
        kinds: CONDITIONAL,
        matches: is_prefixed_jcc,
        resolve: prefixed_jcc,
    },
    // 66 E9 rel16
    Rule {
        kinds: UNCONDITIONAL,
        matches: is_prefixed_jmp,
        resolve: prefixed_jmp,
    },
];

fn is_jcc_condition(byte: u8) -> bool {
    (0x80..=0x8F).contains(&byte)
}

fn is_short_jcc(window: &Window) -> bool {
    (0x70..=0x7F).contains(&window.bytes[0]) || window.bytes[0] == 0xE3
}

fn is_short_jmp(window: &Window) -> bool {
    window.bytes[0] == 0xEB
}

fn is_near_jcc(window: &Window) -> bool {
    window.bytes[0] == 0x0F && is_jcc_condition(window.bytes[1])
}

fn is_near_jmp(window: &Window) -> bool {
    window.bytes[0] == 0xE9
}

fn is_prefixed_jcc(window: &Window) -> bool {
    window.bytes[0] == OPERAND_SIZE_PREFIX
        && window.bytes[1] == 0x0F
        && is_jcc_condition(window.bytes[2])
}

fn is_prefixed_jmp(window: &Window) -> bool {
    window.bytes[0] == OPERAND_SIZE_PREFIX && window.bytes[1] == 0xE9
}

fn short(_: &Window) -> Resolution {
    (0, EncodingVariant::ShortRel8)
}

/// Near form whose opcode is `opcode_len` bytes without prefix
fn near(window: &Window, opcode_len: u64) -> Resolution {
    if window.prev == OPERAND_SIZE_PREFIX {
        (
            1,
            EncodingVariant::NearRel16 {
                opcode_len: opcode_len + 1,
            },
        )
    } else {
        (0, EncodingVariant::NearRel32 { opcode_len })
    }
}

fn near_jcc(window: &Window) -> Resolution {
    near(window, 2)
}

fn near_jmp(window: &Window) -> Resolution {
    near(window, 1)
}

fn prefixed_jcc(_: &Window) -> Resolution {
    (0, EncodingVariant::NearRel16 { opcode_len: 3 })
}

fn prefixed_jmp(_: &Window) -> Resolution {
    (0, EncodingVariant::NearRel16 { opcode_len: 2 })
}

/// Recognize the x86 branch of `kind` at the window address.
///
/// # Returns
///
/// * `Ok((start, variant))` - Absolute start of the instruction and its encoding.
/// * `Err(FaultError::UnrecognizedOpcode)` - Naming the first byte, or the
///   second one if the first is an operand-size prefix.
pub(super) fn decode(
    kind: FaultKind,
    window: &Window,
) -> Result<(u64, EncodingVariant), FaultError> {
    RULES
        .iter()
        .find(|rule| rule.kinds.contains(&kind) && (rule.matches)(window))
        .map(|rule| {
            let (back, variant) = (rule.resolve)(window);
            (window.address - back, variant)
        })
        .ok_or_else(|| {
            let opcode = match window.bytes[0] {
                OPERAND_SIZE_PREFIX => window.bytes[1],
                byte => byte,
            };
            FaultError::UnrecognizedOpcode {
                kind: kind.name(),
                opcode,
            }
        })
}
