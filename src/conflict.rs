use crate::error::FaultError;
use crate::faults::{BitLocation, FaultFunctions, FaultKind, FaultModel};
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Check that a set of faults can be applied together.
///
/// Every edited byte must lie inside the file and no bit may be edited by two
/// faults. Faults are visited in request order, so the reported conflict names
/// the earlier fault first.
///
/// # Arguments
///
/// * `models` - The validated faults of the run.
/// * `file_size` - Size of the input file in bytes.
///
/// # Returns
///
/// * `Ok(())` - The faults are independent and inside the file.
/// * `Err(FaultError::OutOfBounds)` - A fault edits a byte past the end of the file.
/// * `Err(FaultError::OverlappingFault)` - Two faults edit the same bit.
pub fn check_conflicts(models: &[FaultModel], file_size: u64) -> Result<(), FaultError> {
    let mut owners: HashMap<BitLocation, FaultKind> = HashMap::new();

    for model in models {
        // Bounds first, a huge span must not be expanded to bits
        let bytes = model.edited_bytes();
        if *bytes.end() >= file_size {
            let first_outside = (*bytes.start()).max(file_size);
            return Err(FaultError::OutOfBounds(first_outside as i64));
        }
        for location in model.edited_bits() {
            match owners.entry(location) {
                Entry::Occupied(owner) => {
                    return Err(FaultError::OverlappingFault {
                        offset: location.byte,
                        first: owner.get().name(),
                        second: model.name(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(model.kind());
                }
            }
        }
    }

    debug!("{} faults edit {} bits", models.len(), owners.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Architecture, ExecConfig};

    fn build(config: &ExecConfig, tokens: &[&str]) -> FaultModel {
        let kind = FaultKind::from_name(tokens[0]).unwrap();
        let args: Vec<String> = tokens[1..].iter().map(|s| s.to_string()).collect();
        FaultModel::new(kind, config, &args).unwrap()
    }

    fn config() -> ExecConfig {
        ExecConfig::new("in", "out", Some(Architecture::X86), Some(4)).unwrap()
    }

    #[test]
    fn different_bits_of_one_byte_do_not_conflict() {
        let config = config();
        let models = vec![
            build(&config, &["FLP", "0x2", "0"]),
            build(&config, &["FLP", "0x2", "1"]),
        ];
        assert!(check_conflicts(&models, 4).is_ok());
    }

    #[test]
    fn same_bit_conflicts() {
        let config = config();
        let models = vec![
            build(&config, &["Z1B", "0-3"]),
            build(&config, &["FLP", "0x2", "5"]),
        ];
        assert!(matches!(
            check_conflicts(&models, 8),
            Err(FaultError::OverlappingFault {
                offset: 2,
                first: "Z1B",
                second: "FLP"
            })
        ));
    }

    #[test]
    fn word_past_the_end_is_out_of_bounds() {
        let config = config();
        let models = vec![build(&config, &["Z1W", "0x6"])];
        assert!(matches!(
            check_conflicts(&models, 8),
            Err(FaultError::OutOfBounds(8))
        ));
        assert!(check_conflicts(&models, 10).is_ok());
    }

    #[test]
    fn huge_range_is_rejected_before_expansion() {
        let config = config();
        let models = vec![build(&config, &["Z1B", "0-0x7fffffffffffffff"])];
        assert!(matches!(
            check_conflicts(&models, 4),
            Err(FaultError::OutOfBounds(4))
        ));

        let models = vec![build(&config, &["NOP", "0x7ffffffffffffff0-0x7fffffffffffffff"])];
        assert!(matches!(
            check_conflicts(&models, 4),
            Err(FaultError::OutOfBounds(0x7ffffffffffffff0))
        ));
    }
}
