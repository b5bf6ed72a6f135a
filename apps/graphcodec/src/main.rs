//! # graphcodec - Structural Object-Graph Codec
//!
//! The command-line binary over the graphcodec-core engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              apps/graphcodec (THE BINARY)            │
//! │                                                      │
//! │   ┌─────────────┐            ┌──────────────────┐    │
//! │   │    CLI      │            │   Configuration  │    │
//! │   │   (clap)    │            │      (toml)      │    │
//! │   └──────┬──────┘            └────────┬─────────┘    │
//! │          └───────────────┬────────────┘              │
//! │                          ▼                           │
//! │                ┌───────────────────┐                 │
//! │                │  graphcodec-core  │                 │
//! │                │    (THE LOGIC)    │                 │
//! │                └───────────────────┘                 │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! graphcodec inspect -i cache.json
//! graphcodec verify -i cache.json
//! graphcodec flatten -i cache.json -o flat.json
//! graphcodec normalize -i cache.json --config graphcodec.toml
//! ```

use clap::Parser;
use graphcodec::cli::{self, Outcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when `verify` finds an unstable document.
const EXIT_UNSTABLE: i32 = 2;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GRAPHCODEC_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("GRAPHCODEC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graphcodec=info,graphcodec_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    match cli::execute(cli) {
        Ok(Outcome::Success) => {}
        Ok(Outcome::Unstable) => std::process::exit(EXIT_UNSTABLE),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
