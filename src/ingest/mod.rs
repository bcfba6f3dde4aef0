// src/ingest/mod.rs
pub mod feed;
pub mod fetcher;
pub mod sources;
pub mod types;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::cmp::Reverse;
use std::collections::HashSet;

use crate::ingest::feed::date::{parse_timestamp, to_iso};
use crate::ingest::feed::entry::http_url;
use crate::ingest::feed::UNKNOWN_SOURCE;
use crate::ingest::types::{Bucket, FeedFetcher, FeedSource, Item, RawCandidate};
use crate::relevance::RelevanceFilter;

/// Upper bound on persisted items per bucket.
pub const MAX_ITEMS_PER_BUCKET: usize = 80;
/// Concurrent fetch+extract tasks per bucket.
pub const DEFAULT_FAN_OUT: usize = 6;

/// One-time metrics registration (so series show up once a recorder exists).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Candidates extracted from feeds.");
        describe_counter!("ingest_kept_total", "Items persisted after filtering.");
        describe_counter!(
            "ingest_filtered_total",
            "Candidates dropped as invalid or irrelevant."
        );
        describe_counter!("ingest_dedup_total", "Candidates dropped as duplicate URLs.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed fetch errors (network, status, timeout)."
        );
        describe_histogram!("ingest_parse_ms", "Feed extraction time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when a bucket was last aggregated."
        );
    });
}

/* ----------------------------
Text normalization
---------------------------- */

fn normalize_pass(s: &str) -> String {
    // 1) CDATA markers
    let mut out = s.trim();
    if let Some(rest) = out.strip_prefix("<![CDATA[") {
        out = rest;
    }
    if let Some(rest) = out.strip_suffix("]]>") {
        out = rest;
    }

    // 2) HTML entity decode
    let out = html_escape::decode_html_entities(out);

    // 3) Strip tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let out = re_tags.replace_all(&out, " ");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(&out, " ");

    out.trim().to_string()
}

/// Normalize feed text: drop CDATA markers, decode entities, strip markup,
/// collapse whitespace, trim.
///
/// Escaped markup (`&lt;b&gt;`) only becomes a tag after decoding, so the
/// pass repeats until nothing changes. Every changing pass shortens the
/// text, which bounds the loop and makes the function idempotent.
pub fn normalize_text(s: &str) -> String {
    let mut cur = normalize_pass(s);
    loop {
        let next = normalize_pass(&cur);
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

/* ----------------------------
Filter, dedup, rank, cap
---------------------------- */

/// Per-bucket counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub candidates: usize,
    /// Missing title or usable URL.
    pub invalid: usize,
    pub irrelevant: usize,
    pub duplicates: usize,
    pub truncated: usize,
}

#[derive(Debug, Clone)]
pub struct BucketReport {
    pub bucket: Bucket,
    pub items: Vec<Item>,
    pub stats: BucketStats,
}

/// Sort key: epoch millis, with unparseable values sinking to the Unix epoch.
fn recency_key(item: &Item) -> i64 {
    DateTime::parse_from_rfc3339(&item.published_at)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Turn a bucket's candidate pool (in source-list, then entry order) into
/// its final collection.
///
/// Steps: drop invalid → relevance filter → resolve timestamp (missing or
/// unparseable → `now`) → dedup by URL keeping the first seen → stable sort
/// newest first → keep `max_items`.
pub fn finalize_bucket(
    now: DateTime<Utc>,
    pool: Vec<RawCandidate>,
    filter: &RelevanceFilter,
    max_items: usize,
) -> (Vec<Item>, BucketStats) {
    let mut stats = BucketStats {
        candidates: pool.len(),
        ..BucketStats::default()
    };
    let now_iso = to_iso(now);

    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for c in pool {
        let Some(url) = http_url(&c.url) else {
            stats.invalid += 1;
            continue;
        };
        if c.title.trim().is_empty() {
            stats.invalid += 1;
            continue;
        }
        if !filter.is_relevant(&c.search_text) {
            tracing::debug!(
                target: "ingest",
                url = %url,
                hits = ?filter.hits(&c.search_text),
                "candidate not relevant"
            );
            stats.irrelevant += 1;
            continue;
        }

        let published_at = parse_timestamp(&c.published_at_raw)
            .map(to_iso)
            .unwrap_or_else(|| now_iso.clone());

        if !seen_urls.insert(url.clone()) {
            stats.duplicates += 1;
            continue;
        }

        let source = if c.source_name.trim().is_empty() {
            UNKNOWN_SOURCE.to_string()
        } else {
            c.source_name
        };

        items.push(Item {
            title: c.title,
            source,
            url,
            published_at,
        });
    }

    items.sort_by_cached_key(|it| Reverse(recency_key(it)));
    stats.truncated = items.len().saturating_sub(max_items);
    items.truncate(max_items);

    (items, stats)
}

/* ----------------------------
Aggregator
---------------------------- */

/// Drives fetch + extract for a bucket's sources and finalizes the pooled result.
pub struct Aggregator<F> {
    fetcher: F,
    filter: RelevanceFilter,
    max_items: usize,
    fan_out: usize,
}

impl<F: FeedFetcher> Aggregator<F> {
    pub fn new(fetcher: F, filter: RelevanceFilter) -> Self {
        Self {
            fetcher,
            filter,
            max_items: MAX_ITEMS_PER_BUCKET,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    /// Fetch and extract one source. Failures are logged and yield `None`.
    async fn collect_source(&self, bucket: Bucket, src: &FeedSource) -> Option<Vec<RawCandidate>> {
        let topic = src.topic.as_deref().unwrap_or("-");
        match self.fetcher.fetch(&src.url).await {
            Ok(body) => {
                let cands = feed::extract(&body, &src.url);
                tracing::info!(
                    target: "ingest",
                    %bucket, url = %src.url, topic, items = cands.len(),
                    "feed ok"
                );
                Some(cands)
            }
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    %bucket, url = %src.url, topic, error = %e,
                    "feed failed"
                );
                None
            }
        }
    }

    /// Aggregate a bucket using the current instant as the date fallback.
    pub async fn aggregate(&self, bucket: Bucket, sources: &[FeedSource]) -> BucketReport {
        self.aggregate_at(bucket, sources, Utc::now()).await
    }

    pub async fn aggregate_at(
        &self,
        bucket: Bucket,
        sources: &[FeedSource],
        now: DateTime<Utc>,
    ) -> BucketReport {
        ensure_metrics_described();

        // `buffered` yields in input order, so the pool keeps source-list order
        // regardless of which fetch completes first.
        let per_source: Vec<Option<Vec<RawCandidate>>> = stream::iter(sources)
            .map(|src| self.collect_source(bucket, src))
            .buffered(self.fan_out.max(1))
            .collect()
            .await;

        let mut sources_ok = 0usize;
        let mut sources_failed = 0usize;
        let mut pool = Vec::new();
        for res in per_source {
            match res {
                Some(mut cands) => {
                    sources_ok += 1;
                    pool.append(&mut cands);
                }
                None => sources_failed += 1,
            }
        }

        let (items, mut stats) = finalize_bucket(now, pool, &self.filter, self.max_items);
        stats.sources_ok = sources_ok;
        stats.sources_failed = sources_failed;

        // Telemetry
        counter!("ingest_kept_total").increment(items.len() as u64);
        counter!("ingest_filtered_total").increment((stats.invalid + stats.irrelevant) as u64);
        counter!("ingest_dedup_total").increment(stats.duplicates as u64);
        gauge!("ingest_pipeline_last_run_ts").set(now.timestamp().max(0) as f64);

        tracing::info!(
            target: "ingest",
            %bucket,
            sources_ok = stats.sources_ok,
            sources_failed = stats.sources_failed,
            candidates = stats.candidates,
            invalid = stats.invalid,
            irrelevant = stats.irrelevant,
            duplicates = stats.duplicates,
            truncated = stats.truncated,
            kept = items.len(),
            "bucket aggregated"
        );

        BucketReport {
            bucket,
            items,
            stats,
        }
    }
}
