// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ingest::fetcher::FetchError;

/// Output collection a feed source contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Cz,
    Intl,
}

impl Bucket {
    pub fn name(self) -> &'static str {
        match self {
            Bucket::Cz => "cz",
            Bucket::Intl => "intl",
        }
    }

    /// File name of the persisted collection, relative to the output directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Bucket::Cz => "news-cz.json",
            Bucket::Intl => "news-intl.json",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One configured feed URL. `topic` is an operator-facing label used in logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub topic: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Entry recovered from a feed, before validation and filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub source_name: String,
    /// Empty when the entry carried no usable absolute http(s) link.
    pub url: String,
    /// RFC 3339 instant, or empty when the feed date was missing or unparseable.
    pub published_at_raw: String,
    /// Title + body snippet, only used for relevance filtering.
    pub search_text: String,
}

/// Persisted news record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub source: String,
    pub url: String,
    pub published_at: String,
}

/// Retrieves raw feed text for a single URL.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
