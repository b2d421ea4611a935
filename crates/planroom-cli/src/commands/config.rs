//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use planroom_core::error::AppError;
use planroom_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration; secrets are omitted
    Show,
    /// Validate the configuration
    Validate,
}

/// Execute config commands
pub async fn execute(args: &ConfigArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(env)?;
            config.database.url = mask_password(&config.database.url);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(env) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{env}' is valid"));
                output::print_kv(
                    "Server",
                    &format!("{}:{}", config.server.host, config.server.port),
                );
                output::print_kv("Metadata", &config.metadata.backend.to_string());
                output::print_kv("Storage", &config.storage.default_provider);
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
    }

    Ok(())
}
