//! Penguin Classifier CLI Module
//!
//! `serve` runs the HTTP service (the default when no subcommand is given);
//! `check` runs the model load sequence once and reports what it found.

use clap::{Parser, Subcommand};
use colored::*;

use crate::loader::{self, LoadOutcome, LoaderConfig};
use crate::server::{run_server, ServerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }
fn fail(s: &str) -> ColoredString { s.truecolor(230, 110, 100) }

fn kv(key: &str, val: &str) {
    println!("  {} {}", muted(&format!("{:<10}", key)), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "penguin-classifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP inference service for a penguin species classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load the model once and report the source and classes
    Check,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    println!();
    println!("  {} {}", "Penguin Classifier".white().bold(), dim(&format!("v{}", env!("CARGO_PKG_VERSION"))));
    kv("Predict", &format!("http://{}:{}/predict", config.host, config.port));
    kv("Health", &format!("http://{}:{}/health", config.host, config.port));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    run_server(config).await
}

pub async fn cmd_check() -> anyhow::Result<()> {
    let config = LoaderConfig::from_env();

    println!();
    kv("Remote", if config.remote.is_configured() { "configured" } else { "not configured" });
    kv("Model", &config.local.model_path.display().to_string());
    kv("Metadata", &config.local.metadata_path.display().to_string());
    println!();

    match loader::resolve(&config).await {
        LoadOutcome::Ready { model, source } => {
            println!("  {} model ready", ok("✓"));
            kv("Source", source.as_str());
            kv("Objective", &format!("{:?}", model.booster.objective()));
            kv("Features", &model.metadata.schema.len().to_string());
            kv("Classes", &model.metadata.labels.classes().join(", "));
            println!();
            Ok(())
        }
        LoadOutcome::Degraded { remote, local } => {
            println!("  {} no model could be loaded", fail("✗"));
            kv("Remote", &remote.to_string());
            kv("Local", &local.to_string());
            println!();
            anyhow::bail!("model load failed")
        }
    }
}
