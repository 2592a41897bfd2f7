//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod task;

pub use pipeline::RunArgs;
pub use task::TaskCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Launch a pipeline
    Run(RunArgs),
    /// Task inspection and cancellation
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Remove unreadable store files and recompute content stats
    Cleanup,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run(args) => pipeline::handle_run(args, config).await,
        Commands::Task { command } => task::handle_task_command(command, config).await,
        Commands::Cleanup => pipeline::handle_cleanup(config).await,
    }
}
