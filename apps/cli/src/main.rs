//! LeadScout CLI: discover and enrich sales leads from the terminal.
//!
//! Runs a discovery campaign against the configured provider, renders the
//! pipeline narrative live, and optionally enriches and exports the results.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
