//! Penguin Classifier - Main Entry Point

use clap::Parser;
use penguin_classifier::cli::{cmd_check, cmd_serve, Cli, Commands};
use penguin_classifier::loader::load_env_file;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_env_file(None);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "penguin_classifier=info,tower_http=info".into()),
        )
        .init();

    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded environment from file");
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(host, port).await?,
        Some(Commands::Check) => cmd_check().await?,
        None => cmd_serve(None, None).await?,
    }

    Ok(())
}
