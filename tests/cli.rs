use std::fs;
use std::path::{Path, PathBuf};

use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// Temporary directory holding an `in.bin` file and the expected `out.bin` path.
fn workspace(content: &[u8]) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let infile = dir.path().join("in.bin");
    let outfile = dir.path().join("out.bin");
    fs::write(&infile, content).expect("write input");
    (dir, infile, outfile)
}

fn injector(infile: &Path, outfile: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("fault_injector");
    cmd.arg("-i").arg(infile).arg("-o").arg(outfile);
    cmd
}

/// A NOP on x86 replaces exactly one byte of the copy.
#[test]
fn nop_writes_faulted_copy() {
    let (_dir, infile, outfile) = workspace(&[0x11; 8]);

    injector(&infile, &outfile)
        .args(["-a", "x86", "NOP", "0x2"])
        .assert()
        .success();

    let output = fs::read(&outfile).expect("read output");
    assert_eq!(output, [0x11, 0x11, 0x90, 0x11, 0x11, 0x11, 0x11, 0x11]);
    assert_eq!(fs::read(&infile).expect("read input"), [0x11; 8]);
}

/// A rejected fault exits non-zero, prints the reason and leaves no output.
#[test]
fn unknown_opcode_fails_without_output() {
    let (_dir, infile, outfile) = workspace(&[0x31; 8]);

    injector(&infile, &outfile)
        .args(["-a", "x86", "JCC", "0x0", "0x4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Unknow opcode at JCC address : 0x31",
        ));

    assert!(!outfile.exists(), "no output should be written on failure");
}

#[test]
fn missing_architecture_is_reported() {
    let (_dir, infile, outfile) = workspace(&[0x11; 8]);

    injector(&infile, &outfile)
        .args(["NOP", "0x2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Architecture required when using NOP",
        ));
}

#[test]
fn no_fault_models_is_reported() {
    let (_dir, infile, outfile) = workspace(&[0x11; 8]);

    injector(&infile, &outfile)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No fault models provided"));
}

/// Faults read with `-f` are applied after the ones given on the command line.
#[test]
fn faults_from_file() {
    let (dir, infile, outfile) = workspace(&[0xFF; 8]);
    let fault_file = dir.path().join("faults.txt");
    fs::write(&fault_file, "Z1B 0x0-0x1\nFLP 0x4 0\n").expect("write fault file");

    injector(&infile, &outfile)
        .arg("-f")
        .arg(&fault_file)
        .args(["Z1B", "0x7"])
        .assert()
        .success();

    let output = fs::read(&outfile).expect("read output");
    assert_eq!(output, [0x00, 0x00, 0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0x00]);
}

/// Architecture and faults can both come from a JSON5 configuration file.
#[test]
fn faults_from_config_file() {
    let (dir, infile, outfile) = workspace(&[0x11; 8]);
    let config = dir.path().join("config.json5");
    fs::write(
        &config,
        r#"{
            // Thumb NOP on two bytes
            arch: "arm",
            faults: ["NOP", "0x2"],
        }"#,
    )
    .expect("write config");

    injector(&infile, &outfile)
        .arg("-c")
        .arg(&config)
        .assert()
        .success();

    let output = fs::read(&outfile).expect("read output");
    assert_eq!(output, [0x11, 0x11, 0x00, 0xBF, 0x11, 0x11, 0x11, 0x11]);
}

#[test]
fn command_line_overrides_config_architecture() {
    let (dir, infile, outfile) = workspace(&[0x11; 8]);
    let config = dir.path().join("config.json5");
    fs::write(&config, r#"{ arch: "arm", faults: ["NOP", "0x2"] }"#).expect("write config");

    injector(&infile, &outfile)
        .arg("-c")
        .arg(&config)
        .args(["-a", "x86"])
        .assert()
        .success();

    let output = fs::read(&outfile).expect("read output");
    assert_eq!(output[2..4], [0x90, 0x11]);
}

#[test]
fn graphical_prints_diff() {
    let (_dir, infile, outfile) = workspace(&[0x11; 8]);

    injector(&infile, &outfile)
        .env("NO_COLOR", "1")
        .args(["-g", "-a", "x86", "NOP", "0x2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Input:"))
        .stdout(predicate::str::contains("|  11 11 90 11"));
}

#[test]
fn same_input_and_output_is_refused() {
    let (_dir, infile, _outfile) = workspace(&[0x11; 8]);

    injector(&infile, &infile)
        .args(["Z1B", "0x0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("same file"));

    assert_eq!(fs::read(&infile).expect("read input"), [0x11; 8]);
}
