use std::process::ExitCode;

use anyhow::Result;
use balance::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli.run().await
}
