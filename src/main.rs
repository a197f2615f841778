//! HTTP Admission Gate (v1)
//!
//! An edge layer built with Tokio and Axum that decides, before any handler
//! runs, whether a request may proceed.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                    ADMISSION GATE                         │
//!                    │                                                           │
//!  Client Request    │  ┌──────────┐   ┌───────────┐   ┌──────┐   ┌──────┐      │
//!  ──────────────────┼─▶│ client   │──▶│   rate    │──▶│ CORS │──▶│ auth │──────┼──▶ Handler
//!                    │  │ identity │   │   limit   │   │      │   │      │      │
//!                    │  └──────────┘   └─────┬─────┘   └──┬───┘   └──┬───┘      │
//!                    │                       │ 429        │ 204      │ 401      │
//!  Client Response   │                       ▼            ▼          ▼          │
//!  ◀─────────────────┼───────────────────────┴────────────┴──────────┘          │
//!                    │                                                           │
//!                    │  ┌─────────────────────────────────────────────────────┐ │
//!                    │  │              Cross-Cutting Concerns                  │ │
//!                    │  │   config   │  observability  │  lifecycle/shutdown   │ │
//!                    │  └─────────────────────────────────────────────────────┘ │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use admission_gate::config::load_config;
use admission_gate::lifecycle;
use admission_gate::observability::logging;

#[derive(Parser)]
#[command(name = "admission-gate")]
#[command(about = "Rate limiting, CORS and authentication in front of an HTTP API", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), std::env::vars()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.print_config {
        return match toml::to_string_pretty(&config) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {e}");
                ExitCode::FAILURE
            }
        };
    }

    logging::init_logging(&config.observability);
    tracing::info!("admission-gate v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::start(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gate stopped with an error");
            ExitCode::FAILURE
        }
    }
}
