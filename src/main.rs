//! CLI entry point for layered collection generation

use clap::Parser;
use greedylayers::io::cli::{Cli, RequestProcessor};
use greedylayers::io::logging::init_logging;

fn main() -> greedylayers::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let mut processor = RequestProcessor::new(cli)?;
    processor.process().map(|_written| ())
}
