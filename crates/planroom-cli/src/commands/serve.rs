//! Start the Planroom server.

use clap::Args;

use planroom_core::error::AppError;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, env: &str) -> Result<(), AppError> {
    let mut config = super::load_config(env)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }

    println!("Starting Planroom server...");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Metadata: {}", config.metadata.backend);
    println!("  Storage:  {}", config.storage.default_provider);

    planroom_api::run_server(config).await
}
