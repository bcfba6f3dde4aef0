// src/config/mod.rs
//! Run options: CLI flags with environment fallbacks.

use clap::Parser;
use std::path::PathBuf;

use crate::ingest::fetcher::DEFAULT_TIMEOUT_MS;
use crate::ingest::{DEFAULT_FAN_OUT, MAX_ITEMS_PER_BUCKET};

pub const DEFAULT_OUT_DIR: &str = "data";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "marketplace-news",
    version,
    about = "Aggregate RSS/Atom feeds into the cz and intl news collections"
)]
pub struct RunOptions {
    /// Sources file (JSON or TOML). Falls back to $NEWS_SOURCES_PATH,
    /// config/sources.json, config/sources.toml.
    #[arg(long, value_name = "FILE")]
    pub sources: Option<PathBuf>,

    /// Keyword tiers (TOML). Falls back to $RELEVANCE_KEYWORDS_PATH,
    /// config/keywords.toml, then the built-in seed.
    #[arg(long, value_name = "FILE")]
    pub keywords: Option<PathBuf>,

    /// Directory receiving news-cz.json and news-intl.json.
    #[arg(long, value_name = "DIR", env = "NEWS_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    /// Per-feed request timeout in milliseconds.
    #[arg(long, env = "NEWS_FETCH_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Concurrent feed fetches per bucket.
    #[arg(long, env = "NEWS_FETCH_CONCURRENCY", default_value_t = DEFAULT_FAN_OUT)]
    pub concurrency: usize,

    /// Maximum items kept per bucket.
    #[arg(long, env = "NEWS_MAX_ITEMS", default_value_t = MAX_ITEMS_PER_BUCKET)]
    pub max_items: usize,

    /// Aggregate and log, but do not write output files.
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sources: None,
            keywords: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            concurrency: DEFAULT_FAN_OUT,
            max_items: MAX_ITEMS_PER_BUCKET,
            dry_run: false,
        }
    }
}
