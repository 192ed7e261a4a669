//! The `map` command: generate the pass-ordered mapping artifact

pub mod handler;

use std::path::PathBuf;

use clap::Args;

pub use handler::handle_map_command;

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Where to write the mapping artifact (JSON)
    pub path: PathBuf,

    /// Print the planned pass order instead of writing the artifact
    #[arg(long)]
    pub dry_run: bool,

    /// Print progress and timing details
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
