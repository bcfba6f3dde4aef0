//! marketplace-news: binary entrypoint.
//! Loads `.env`, initializes tracing, runs one aggregation and maps the
//! outcome to the process exit code.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marketplace_news::RunOptions;

/// Logs go to stderr. `RUST_LOG` overrides the default `info` filter;
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let opts = RunOptions::parse();
    let reports = marketplace_news::run(&opts).await.inspect_err(|e| {
        tracing::error!(error = %format!("{e:#}"), "run failed");
    })?;

    let kept: usize = reports.iter().map(|r| r.items.len()).sum();
    tracing::info!(kept, "run finished");
    Ok(())
}
