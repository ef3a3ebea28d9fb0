//! Benchmark sweep executable for perfsweep.

use anyhow::Result;
use clap::Parser;
use perfsweep_driver::cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli)
}
