//! Side by side hex view of the input and the faulted output
//!
//! Every edited byte is highlighted with the color of the fault that changed it.

use crate::error::FaultError;
use crate::faults::{FaultKind, FaultModel};
use colored::Colorize;
use itertools::Itertools;
use std::collections::HashMap;
use std::path::Path;

const ROW_WIDTH: u64 = 16;

fn hex_row(data: &[u8], row: u64, owners: &HashMap<u64, FaultKind>) -> String {
    (row..row + ROW_WIDTH)
        .map(|offset| match data.get(offset as usize) {
            Some(byte) => {
                let text = format!("{:02x}", byte);
                match owners.get(&offset) {
                    Some(kind) => text.color(kind.color()).bold().to_string(),
                    None => text,
                }
            }
            None => "  ".to_string(),
        })
        .join(" ")
}

/// Render the rows of `input` and `output` that contain edited bytes.
///
/// The first line is a legend of the applied fault kinds in their colors,
/// followed by one line per 16-byte row: offset, input bytes, output bytes.
pub fn render_diff(input: &[u8], output: &[u8], models: &[FaultModel]) -> Vec<String> {
    let owners: HashMap<u64, FaultKind> = models
        .iter()
        .flat_map(|model| {
            model
                .edited_byte_ranges()
                .into_iter()
                .flatten()
                .map(move |offset| (offset, model.kind()))
        })
        .collect();

    let legend = models
        .iter()
        .map(FaultModel::kind)
        .unique()
        .map(|kind| kind.name().color(kind.color()).to_string())
        .join("  ");

    let rows = owners
        .keys()
        .map(|offset| offset - offset % ROW_WIDTH)
        .sorted()
        .dedup()
        .map(|row| {
            format!(
                "{:08x}  {}  |  {}",
                row,
                hex_row(input, row, &owners),
                hex_row(output, row, &owners)
            )
        });

    std::iter::once(legend).chain(rows).collect()
}

/// Print the diff of two files, highlighting the bytes edited by `models`.
pub fn print_diff(input: &Path, output: &Path, models: &[FaultModel]) -> Result<(), FaultError> {
    let input_data = std::fs::read(input)?;
    let output_data = std::fs::read(output)?;

    println!("Input: {}  |  Output: {}", input.display(), output.display());
    for line in render_diff(&input_data, &output_data, models) {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Architecture, ExecConfig};

    #[test]
    fn only_edited_rows_are_rendered() {
        colored::control::set_override(false);
        let config = ExecConfig::new("in", "out", Some(Architecture::X86), None).unwrap();
        let models = vec![
            FaultModel::new(FaultKind::Nop, &config, &["0x11".to_string()]).unwrap(),
            FaultModel::new(FaultKind::Z1b, &config, &["0x12".to_string()]).unwrap(),
        ];
        let input: Vec<u8> = (0..40).collect();
        let mut output = input.clone();
        output[0x11] = 0x90;
        output[0x12] = 0x00;

        let lines = render_diff(&input, &output, &models);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "NOP  Z1B");
        assert!(lines[1].starts_with("00000010  10 11 12 13"));
        assert!(lines[1].contains("|  10 90 00 13"));
    }
}
