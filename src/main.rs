//! `bc3`: inspect and price FIEBDC-3 (BC3) budgets from the command line.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
