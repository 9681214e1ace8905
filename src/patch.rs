use crate::error::FaultError;
use crate::faults::{FaultFunctions, FaultModel};
use log::debug;
use std::fs::OpenOptions;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Apply every fault, in order, to an opened file.
pub fn apply_all<F: Read + Write + Seek>(
    models: &[FaultModel],
    file: &mut F,
) -> Result<(), FaultError> {
    for model in models {
        debug!("Apply {} at {:X?}", model.name(), model.edited_byte_ranges());
        model.apply(file)?;
    }
    file.flush()?;
    Ok(())
}

/// Open the output file once and apply every fault to it.
///
/// The faults must have passed [`crate::conflict::check_conflicts`].
pub fn apply_faults(models: &[FaultModel], output: &Path) -> Result<(), FaultError> {
    let mut file = OpenOptions::new().read(true).write(true).open(output)?;
    apply_all(models, &mut file)
}
