use crate::config::ExecConfig;
use crate::conflict::check_conflicts;
use crate::error::FaultError;
use crate::faults::{FaultKind, FaultModel};
use crate::patch::apply_faults;
use log::info;
use std::iter;

/// Split a token stream into `(kind, arguments)` groups.
///
/// A group starts at every token naming a fault kind and ends before the next
/// one. The stream must start with a fault kind.
pub fn group_tokens(tokens: &[String]) -> Result<Vec<(FaultKind, &[String])>, FaultError> {
    let heads: Vec<(usize, FaultKind)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(index, token)| FaultKind::from_name(token).map(|kind| (index, kind)))
        .collect();

    match (tokens.first(), heads.first()) {
        (None, _) => return Err(FaultError::NoFaultModels),
        (Some(_), Some((0, _))) => {}
        (Some(token), _) => return Err(FaultError::UnknownFaultModel(token.clone())),
    }

    let ends = heads
        .iter()
        .skip(1)
        .map(|(index, _)| *index)
        .chain(iter::once(tokens.len()));
    Ok(heads
        .iter()
        .zip(ends)
        .map(|(&(start, kind), end)| (kind, &tokens[start + 1..end]))
        .collect())
}

/// Build every fault model requested by `tokens`, in order.
///
/// Fails on the first invalid group; no model is returned in that case.
pub fn parse_fault_models(
    config: &ExecConfig,
    tokens: &[String],
) -> Result<Vec<FaultModel>, FaultError> {
    group_tokens(tokens)?
        .into_iter()
        .map(|(kind, args)| FaultModel::new(kind, config, args))
        .collect()
}

/// A validated batch of faults ready to be written.
///
/// Construction parses and validates every fault and checks the whole batch
/// for conflicts; the output file is only created and modified by
/// [`FaultInjector::run`].
pub struct FaultInjector {
    config: ExecConfig,
    models: Vec<FaultModel>,
}

impl FaultInjector {
    /// Creates a new `FaultInjector`.
    ///
    /// # Arguments
    ///
    /// * `config` - Immutable run configuration.
    /// * `tokens` - Fault specification, e.g. `["FLP", "0x10", "3", "NOP", "0x20-0x23"]`.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - All faults are valid and independent.
    /// * `Err(FaultError)` - The first problem found; nothing was written.
    pub fn new(config: ExecConfig, tokens: &[String]) -> Result<Self, FaultError> {
        let models = parse_fault_models(&config, tokens)?;
        check_conflicts(&models, config.input_size()?)?;
        info!("{} fault models validated", models.len());
        Ok(Self { config, models })
    }

    /// The validated faults in request order
    pub fn models(&self) -> &[FaultModel] {
        &self.models
    }

    /// Duplicate the input file to the output file and apply every fault.
    pub fn run(&self) -> Result<(), FaultError> {
        let infile = self.config.infile();
        let outfile = self.config.outfile();
        if outfile.exists() && infile.canonicalize()? == outfile.canonicalize()? {
            return Err(FaultError::InvalidConfiguration(format!(
                "Input and output are the same file : {}",
                infile.display()
            )));
        }

        std::fs::copy(infile, outfile)?;
        apply_faults(&self.models, outfile)?;
        info!(
            "{} fault models applied to {}",
            self.models.len(),
            outfile.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn groups_follow_kind_names() {
        let tokens = tokens(&["NOP", "0x3", "FLP", "0x1", "2", "Z1B"]);
        let groups = group_tokens(&tokens).unwrap();
        let shape: Vec<(FaultKind, usize)> =
            groups.iter().map(|(kind, args)| (*kind, args.len())).collect();
        assert_eq!(
            shape,
            vec![(FaultKind::Nop, 1), (FaultKind::Flp, 2), (FaultKind::Z1b, 0)]
        );
    }

    #[test]
    fn stream_must_start_with_a_kind() {
        assert!(matches!(group_tokens(&[]), Err(FaultError::NoFaultModels)));
        assert!(matches!(
            group_tokens(&tokens(&["0x3", "NOP", "0x4"])),
            Err(FaultError::UnknownFaultModel(token)) if token == "0x3"
        ));
    }

    #[test]
    fn argument_count_is_checked_per_group() {
        let config = ExecConfig::new("in", "out", None, None).unwrap();
        assert!(matches!(
            parse_fault_models(&config, &tokens(&["Z1B", "0x1", "0x2", "Z1B", "0x3"])),
            Err(FaultError::InvalidArgumentCount {
                kind: "Z1B",
                expected: 1,
                found: 2
            })
        ));
    }
}
