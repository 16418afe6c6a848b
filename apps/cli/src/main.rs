//! Dossier CLI: compile regulatory documents into one paginated PDF dossier.
//!
//! Documents are grouped into categories, given an accurate table of
//! contents, and merged behind a cover page with a closing summary.

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
