use clap::Parser;
use env_logger::Env;
use std::process::ExitCode;

use fault_injector::prelude::*;

/// Collect the configuration, validate every fault and write the faulted copy
///
fn run(args: Args) -> Result<(), FaultError> {
    // Configuration file first, command line values override it
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.override_with_args(&args)?;

    let exec_config = config.exec_config(&args.infile, &args.outfile)?;
    let injector = FaultInjector::new(exec_config, &config.faults)?;
    injector.run()?;

    // Compare Input/Output with the faults highlighted
    if config.graphical {
        print_diff(&args.infile, &args.outfile, injector.models())?;
    }
    Ok(())
}

/// Program to inject faults into a copy of a binary file
///
fn main() -> ExitCode {
    // Get parameter from command line
    let args = Args::parse();
    // Warnings are shown by default, more with: RUST_LOG=debug
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
