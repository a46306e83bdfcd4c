// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, run once, map the outcome to an
//   exit code. Usage errors are handled by clap (exit code 2).

use std::process::ExitCode;

use clap::Parser;
use teledrop::{cli, logging, ui};

fn main() -> ExitCode {
    logging::init();
    let args = cli::Args::parse();

    match cli::run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            ui::failure(&e);
            ExitCode::FAILURE
        }
    }
}
