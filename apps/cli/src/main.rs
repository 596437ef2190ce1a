//! spl: Shopline store CLI.
//!
//! Lists orders, products, and customers, with optional concurrent
//! enrichment of orders into full detail records.

mod commands;
mod output;

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
