//! Incidesk CLI — incident-report lookup assistant.
//!
//! Syncs incident reports from a Confluence page tree into a local table,
//! searches them by keyword, and summarizes matches through a
//! language-model API.

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
