#![forbid(unsafe_code)]

use clap::Parser;
use gatekeeper_lib::{load_from_path, server, telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Gatekeeper admission-control service")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", default_value = "config/gatekeeper.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Tracing is not up yet; config errors go straight to stderr.
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = telemetry::init_tracing(&cfg.logging, &cfg.telemetry.otel_log_level) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(listen = %cfg.listen, "configuration loaded");

    if let Err(err) = server::run(Arc::new(cfg)).await {
        error!(%err, "server exited with error");
        std::process::exit(1);
    }
}
