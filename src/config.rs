use crate::error::FaultError;
use crate::faults::FaultKind;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Instruction set of the binary to be faulted
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    Arm,
}

/// Immutable configuration of one injection run.
///
/// Shared read-only by every fault model. Created once from the command line
/// (and optional configuration file) and never changed afterwards.
#[derive(Clone, Debug)]
pub struct ExecConfig {
    infile: PathBuf,
    outfile: PathBuf,
    arch: Option<Architecture>,
    word_length: Option<u64>,
}

impl ExecConfig {
    /// Creates a new `ExecConfig`.
    ///
    /// # Arguments
    ///
    /// * `infile` - Binary to read the original content from.
    /// * `outfile` - Destination of the faulted copy.
    /// * `arch` - Architecture, required by NOP, JMP, JBE and JCC.
    /// * `word_length` - Bytes per word, required by Z1W.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The configuration.
    /// * `Err(FaultError::InvalidConfiguration)` - If `word_length` is zero.
    pub fn new(
        infile: impl Into<PathBuf>,
        outfile: impl Into<PathBuf>,
        arch: Option<Architecture>,
        word_length: Option<u64>,
    ) -> Result<Self, FaultError> {
        if word_length == Some(0) {
            return Err(FaultError::InvalidConfiguration(
                "Word size must be positive".to_string(),
            ));
        }
        Ok(Self {
            infile: infile.into(),
            outfile: outfile.into(),
            arch,
            word_length,
        })
    }

    pub fn infile(&self) -> &Path {
        &self.infile
    }

    pub fn outfile(&self) -> &Path {
        &self.outfile
    }

    /// Architecture, or `MissingConfiguration` naming the fault kind that needs it
    pub fn require_arch(&self, kind: FaultKind) -> Result<Architecture, FaultError> {
        self.arch.ok_or(FaultError::MissingConfiguration {
            kind: kind.name(),
            setting: "Architecture",
        })
    }

    /// Word length, or `MissingConfiguration` naming the fault kind that needs it
    pub fn require_word_length(&self, kind: FaultKind) -> Result<u64, FaultError> {
        self.word_length.ok_or(FaultError::MissingConfiguration {
            kind: kind.name(),
            setting: "Word size",
        })
    }

    /// Size of the original input file in bytes
    pub fn input_size(&self) -> Result<u64, FaultError> {
        Ok(std::fs::metadata(&self.infile)?.len())
    }
}

/// Configuration structure that can be loaded from JSON5
///
/// ```json5
/// {
///     arch: "arm",
///     word_length: 4,
///     graphical: false,
///     faults: ["NOP", "0x10", "FLP", "0x20", "3"],
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub arch: Option<Architecture>,
    #[serde(default)]
    pub word_length: Option<u64>,
    #[serde(default)]
    pub graphical: bool,
    #[serde(default)]
    pub faults: Vec<String>,
}

impl Config {
    /// Load configuration from JSON5 file
    pub fn from_file(path: &Path) -> Result<Self, FaultError> {
        let content = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&content)?)
    }

    /// Override config values with command line arguments
    ///
    /// Fault tokens given on the command line come first, followed by the ones
    /// from the configuration file and finally the ones read with `--fromfile`.
    pub fn override_with_args(&mut self, args: &Args) -> Result<(), FaultError> {
        if args.arch.is_some() {
            self.arch = args.arch;
        }
        if args.wordsize.is_some() {
            self.word_length = args.wordsize;
        }
        if args.graphical {
            self.graphical = true;
        }

        let mut faults = args.fault_models.clone();
        faults.append(&mut self.faults);
        if let Some(path) = &args.fromfile {
            faults.extend(read_fault_file(path)?);
        }
        self.faults = faults;
        Ok(())
    }

    /// Build the immutable run configuration.
    pub fn exec_config(&self, infile: &Path, outfile: &Path) -> Result<ExecConfig, FaultError> {
        ExecConfig::new(infile, outfile, self.arch, self.word_length)
    }
}

/// Read whitespace separated fault tokens from a file
pub fn read_fault_file(path: &Path) -> Result<Vec<String>, FaultError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

fn fault_model_help() -> String {
    let lines: Vec<String> = FaultKind::ALL
        .iter()
        .map(|kind| format!("    {}", kind.docs()))
        .collect();
    format!(
        "The possible models are :\n{}\naddr can be a number or a range (number-number)",
        lines.join("\n")
    )
}

/// Command-line arguments of the fault injector.
///
/// # Fields
///
/// * `infile` - Path to the source binary.
/// * `outfile` - Path to the faulted copy.
/// * `wordsize` - Number of bytes in a word (Z1W).
/// * `arch` - Architecture of the executable (NOP, JMP, JBE, JCC).
/// * `graphical` - Print a colored diff of input and output after injection.
/// * `fromfile` - Read additional fault models from a file.
/// * `config` - Load configuration from JSON5 file.
/// * `fault_models` - Fault models, each followed by its parameters.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Software implemented fault injection tool",
    long_about = None,
    after_help = fault_model_help()
)]
pub struct Args {
    /// Path to the source file
    #[arg(short, long)]
    pub infile: PathBuf,

    /// Path to the destination file
    #[arg(short, long)]
    pub outfile: PathBuf,

    /// Number of bytes in a word
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub wordsize: Option<u64>,

    /// Architecture of the executable
    #[arg(short, long, value_enum)]
    pub arch: Option<Architecture>,

    /// Show a diff comparing the input and the output with the faults highlighted
    #[arg(short, long, default_value_t = false)]
    pub graphical: bool,

    /// Read the fault models from a file instead of command line
    #[arg(short, long)]
    pub fromfile: Option<PathBuf>,

    /// Load configuration from JSON5 file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// One fault model followed by its parameters
    #[arg(value_name = "FAULT_MODEL", allow_negative_numbers = true)]
    pub fault_models: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_word_length_is_rejected() {
        assert!(matches!(
            ExecConfig::new("in", "out", None, Some(0)),
            Err(FaultError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_settings_name_the_fault_kind() {
        let config = ExecConfig::new("in", "out", None, None).unwrap();
        let err = config.require_arch(FaultKind::Nop).unwrap_err();
        assert_eq!(err.to_string(), "Architecture required when using NOP");
        let err = config.require_word_length(FaultKind::Z1w).unwrap_err();
        assert_eq!(err.to_string(), "Word size required when using Z1W");
    }

    #[test]
    fn json5_config_is_overridden_by_arguments() {
        let mut config: Config = json5::from_str(
            r#"{
                // comments are allowed
                arch: "arm",
                word_length: 2,
                faults: ["NOP", "0x4"],
            }"#,
        )
        .unwrap();
        let args = Args::parse_from([
            "fault_injector",
            "-i",
            "in.bin",
            "-o",
            "out.bin",
            "-a",
            "x86",
            "Z1B",
            "0x1",
        ]);
        config.override_with_args(&args).unwrap();

        assert_eq!(config.arch, Some(Architecture::X86));
        assert_eq!(config.word_length, Some(2));
        assert_eq!(config.faults, vec!["Z1B", "0x1", "NOP", "0x4"]);
    }
}
