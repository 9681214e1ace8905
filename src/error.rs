//! Error types of the fault injector

use thiserror::Error;

/// Every reason a fault injection run can be rejected.
///
/// All variants abort the run before the output file is modified.
#[derive(Debug, Error)]
pub enum FaultError {
    #[error("Wrong address format : {0}")]
    InvalidAddressFormat(String),

    #[error("Address range empty : {0}")]
    EmptyAddressRange(String),

    #[error("Wrong number of parameters for {kind} : expected {expected}, got {found}")]
    InvalidArgumentCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{setting} required when using {kind}")]
    MissingConfiguration {
        kind: &'static str,
        setting: &'static str,
    },

    #[error("Unknow opcode at {kind} address : {opcode:#x}")]
    UnrecognizedOpcode { kind: &'static str, opcode: u8 },

    #[error("Opcode {opcode:#x} only supported with x86")]
    ArchitectureMismatch { opcode: u8 },

    #[error("Target value out of range : {0}")]
    DisplacementOutOfRange(i64),

    #[error("Address outside file content : byte {0:#x}")]
    OutOfBounds(i64),

    #[error("Applying two fault models at the same place : byte {offset:#x} ({first} and {second})")]
    OverlappingFault {
        offset: u64,
        first: &'static str,
        second: &'static str,
    },

    #[error("Target outside the file : {0:#x}")]
    TargetOutsideFile(i64),

    #[error("Invalid target for {kind} : {token}")]
    InvalidTarget { kind: &'static str, token: String },

    #[error("Wrong significance format : {0}")]
    InvalidSignificance(String),

    #[error("Range of addresses not supported with {0}")]
    RangeNotSupported(&'static str),

    #[error("Range of addresses for {kind} must be multiple of {unit} : {len} bytes")]
    MisalignedRange {
        kind: &'static str,
        unit: u64,
        len: u64,
    },

    #[error("Unknown fault model : {0}")]
    UnknownFaultModel(String),

    #[error("No fault models provided")]
    NoFaultModels,

    #[error("Invalid configuration : {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse JSON5 config: {0}")]
    Config(#[from] json5::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
