//! forcedata-cli entry point

mod api;
mod cli;
mod config;
mod mapping;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cli::commands::mapping::MapArgs;

#[derive(Parser)]
#[command(
    name = "forcedata-cli",
    about = "Data-migration planner for Salesforce orgs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the dependency-ordered load plan and write the mapping artifact
    Map(MapArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Map(args) => cli::commands::mapping::handle_map_command(args).await,
    }
}
