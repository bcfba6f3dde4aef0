// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod persist;
pub mod relevance;

// ---- Re-exports for stable public API ----
pub use crate::config::RunOptions;
pub use crate::ingest::types::{Bucket, FeedSource, Item, RawCandidate};
pub use crate::ingest::{normalize_text, Aggregator, BucketReport, MAX_ITEMS_PER_BUCKET};
pub use crate::relevance::{KeywordTiers, RelevanceFilter};

use anyhow::Context;
use chrono::Utc;

use crate::ingest::fetcher::HttpFetcher;
use crate::ingest::sources::{load_sources_default, SourcesConfig};
use crate::ingest::types::FeedFetcher;

/// One full run: load configuration, aggregate both buckets, write outputs.
///
/// Configuration errors are returned; per-feed failures are only logged.
pub async fn run(opts: &RunOptions) -> anyhow::Result<Vec<BucketReport>> {
    let sources = load_sources_default(opts.sources.as_deref())?;
    tracing::info!(
        cz = sources.cz.len(),
        intl = sources.intl.len(),
        "sources loaded"
    );
    let tiers = KeywordTiers::load_default(opts.keywords.as_deref())?;
    let fetcher = HttpFetcher::new(opts.timeout_ms).context("building http client")?;
    run_with(opts, &sources, RelevanceFilter::new(tiers), fetcher).await
}

/// Like [`run`], with sources, filter and fetcher supplied by the caller.
pub async fn run_with<F: FeedFetcher>(
    opts: &RunOptions,
    sources: &SourcesConfig,
    filter: RelevanceFilter,
    fetcher: F,
) -> anyhow::Result<Vec<BucketReport>> {
    let agg = Aggregator::new(fetcher, filter)
        .with_max_items(opts.max_items)
        .with_fan_out(opts.concurrency);

    // Buckets share nothing mutable; aggregate them concurrently against one run instant.
    let now = Utc::now();
    let (cz, intl) = tokio::join!(
        agg.aggregate_at(Bucket::Cz, sources.bucket(Bucket::Cz), now),
        agg.aggregate_at(Bucket::Intl, sources.bucket(Bucket::Intl), now),
    );
    let reports = vec![cz, intl];

    // Writes happen only after both buckets are complete.
    if opts.dry_run {
        tracing::info!("dry run: output files not written");
    } else {
        for r in &reports {
            persist::save_bucket(&opts.out_dir, r.bucket, &r.items)?;
        }
    }
    Ok(reports)
}
