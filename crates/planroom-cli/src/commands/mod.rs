//! CLI command definitions and dispatch.

pub mod config;
pub mod files;
pub mod health;
pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

use planroom_api::AppState;
use planroom_core::config::AppConfig;
use planroom_core::error::AppError;

use crate::output::OutputFormat;

/// Planroom: construction document sharing with version history
#[derive(Debug, Parser)]
#[command(name = "planroom", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment; loads `config/default.toml` then `config/<env>.toml`
    #[arg(short, long, env = "PLANROOM_ENV", default_value = "development")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the Planroom server
    Serve(serve::ServeArgs),
    /// Apply database migrations
    Migrate,
    /// Inspect and manage stored documents
    Files(files::FilesArgs),
    /// Check metadata store and storage providers
    Health,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Serve(args) => serve::execute(args, &self.config).await,
            Commands::Migrate => migrate::execute(&self.config).await,
            Commands::Files(args) => files::execute(args, &self.config, self.format).await,
            Commands::Health => health::execute(&self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Helper: open the configured store and storage providers
pub async fn open_state(env: &str) -> Result<AppState, AppError> {
    let config = load_config(env)?;
    planroom_api::build_state(config).await
}
