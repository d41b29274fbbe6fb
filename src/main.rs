use std::process::ExitCode;

use beadgrid::{cli, logger};
use clap::Parser;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = cli::Cli::parse();
    cli::run(args)
}
