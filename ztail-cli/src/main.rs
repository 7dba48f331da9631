//! ztail binary entry point.

use clap::Parser;
use ztail_cli::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}
