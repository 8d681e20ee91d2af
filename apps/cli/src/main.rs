//! changedoc CLI: documents data-related code changes in a project wiki.
//!
//! Reads one commit, asks an LLM whether and how the knowledge base should
//! change, and writes the resulting pages.

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
