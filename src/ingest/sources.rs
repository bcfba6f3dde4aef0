// src/ingest/sources.rs
//! Feed source configuration: `{ "cz": [...], "intl": [...] }` in JSON or TOML.
//!
//! An entry is a bare URL string or `{ url, topic? }`. Entries that are
//! neither, or whose URL is not absolute http(s), are skipped with a warning.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ingest::feed::entry::http_url;
use crate::ingest::types::{Bucket, FeedSource};

pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";
pub const DEFAULT_SOURCES_JSON: &str = "config/sources.json";
pub const DEFAULT_SOURCES_TOML: &str = "config/sources.toml";

/// Fatal configuration problems; any of these aborts the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read sources from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no sources file found (tried {0})")]
    NotFound(String),
    #[error("unsupported sources format: {0}")]
    Parse(String),
    #[error("sources configuration has no feeds in either bucket")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        topic: Option<String>,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct RawSources {
    #[serde(default)]
    cz: Vec<RawEntry>,
    #[serde(default)]
    intl: Vec<RawEntry>,
}

/// Ordered feed lists for both buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcesConfig {
    pub cz: Vec<FeedSource>,
    pub intl: Vec<FeedSource>,
}

impl SourcesConfig {
    pub fn bucket(&self, bucket: Bucket) -> &[FeedSource] {
        match bucket {
            Bucket::Cz => &self.cz,
            Bucket::Intl => &self.intl,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cz.is_empty() && self.intl.is_empty()
    }
}

fn clean_entries(bucket: Bucket, entries: Vec<RawEntry>) -> Vec<FeedSource> {
    let mut out = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let (url, topic) = match entry {
            RawEntry::Url(url) => (url, None),
            RawEntry::Detailed { url, topic } => (url, topic),
            RawEntry::Other(v) => {
                tracing::warn!(%bucket, index = idx, entry = %v, "skipping malformed source entry");
                continue;
            }
        };
        let Some(url) = http_url(&url) else {
            tracing::warn!(%bucket, index = idx, url = %url, "skipping source with invalid url");
            continue;
        };
        let topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        out.push(FeedSource { url, topic });
    }
    out
}

fn into_config(raw: RawSources) -> Result<SourcesConfig, ConfigError> {
    let cfg = SourcesConfig {
        cz: clean_entries(Bucket::Cz, raw.cz),
        intl: clean_entries(Bucket::Intl, raw.intl),
    };
    if cfg.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(cfg)
}

fn parse_toml(s: &str) -> Result<RawSources, ConfigError> {
    toml::from_str(s).map_err(|e| ConfigError::Parse(format!("toml: {e}")))
}

fn parse_json(s: &str) -> Result<RawSources, ConfigError> {
    serde_json::from_str(s).map_err(|e| ConfigError::Parse(format!("json: {e}")))
}

/// Parse sources text; `hint_ext` ("json" / "toml") picks the first format tried.
pub fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesConfig, ConfigError> {
    let raw = if hint_ext == "toml" {
        parse_toml(s).or_else(|_| parse_json(s))?
    } else {
        match parse_json(s) {
            Ok(v) => v,
            Err(json_err) => parse_toml(s).map_err(|_| json_err)?,
        }
    };
    into_config(raw)
}

/// Load sources from an explicit path. Supports JSON or TOML formats.
pub fn load_sources_from(path: &Path) -> Result<SourcesConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using explicit path + fallbacks:
/// 1) `explicit` (CLI)
/// 2) $NEWS_SOURCES_PATH
/// 3) config/sources.json
/// 4) config/sources.toml
pub fn load_sources_default(explicit: Option<&Path>) -> Result<SourcesConfig, ConfigError> {
    if let Some(p) = explicit {
        return load_sources_from(p);
    }
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        return load_sources_from(&PathBuf::from(p));
    }
    for candidate in [DEFAULT_SOURCES_JSON, DEFAULT_SOURCES_TOML] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_sources_from(&p);
        }
    }
    Err(ConfigError::NotFound(format!(
        "${ENV_SOURCES_PATH}, {DEFAULT_SOURCES_JSON}, {DEFAULT_SOURCES_TOML}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn json_mixed_entries() {
        let json = r#"{
            "cz": ["https://a.cz/rss", {"url": "https://b.cz/rss", "topic": " safety "}],
            "intl": [{"url": "https://c.com/atom"}, 42, {"topic": "no url"}, "ftp://x", ""]
        }"#;
        let cfg = parse_sources(json, "json").unwrap();
        assert_eq!(
            cfg.cz,
            vec![
                FeedSource::new("https://a.cz/rss"),
                FeedSource::new("https://b.cz/rss").with_topic("safety"),
            ]
        );
        assert_eq!(cfg.intl, vec![FeedSource::new("https://c.com/atom")]);
    }

    #[test]
    fn toml_format_and_missing_bucket() {
        let toml = r#"
cz = ["https://a.cz/rss", { url = "https://b.cz/rss", topic = "recalls" }]
"#;
        let cfg = parse_sources(toml, "toml").unwrap();
        assert_eq!(cfg.cz.len(), 2);
        assert!(cfg.intl.is_empty());
        assert_eq!(cfg.bucket(Bucket::Cz)[1].topic.as_deref(), Some("recalls"));
    }

    #[test]
    fn empty_config_is_fatal() {
        assert!(matches!(
            parse_sources(r#"{"cz": [], "intl": []}"#, "json"),
            Err(ConfigError::Empty)
        ));
        assert!(matches!(
            parse_sources(r#"{"cz": [17, "not a url"]}"#, "json"),
            Err(ConfigError::Empty)
        ));
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(
            parse_sources("this is neither", "json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the test does not read a real config/ directory
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_SOURCES_PATH);

        assert!(matches!(
            load_sources_default(None),
            Err(ConfigError::NotFound(_))
        ));

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_SOURCES_TOML),
            r#"intl = ["https://t.test/feed"]"#,
        )
        .unwrap();
        let v = load_sources_default(None).unwrap();
        assert_eq!(v.intl, vec![FeedSource::new("https://t.test/feed")]);

        // Env wins over fallbacks
        let p_json = tmp.path().join("sources.json");
        fs::write(&p_json, r#"{"cz": ["https://e.test/rss"]}"#).unwrap();
        env::set_var(ENV_SOURCES_PATH, p_json.display().to_string());
        let v2 = load_sources_default(None).unwrap();
        assert_eq!(v2.cz, vec![FeedSource::new("https://e.test/rss")]);
        env::remove_var(ENV_SOURCES_PATH);

        env::set_current_dir(&old).unwrap();
    }

    #[test]
    fn missing_explicit_file_is_io_error() {
        let res = load_sources_from(Path::new("/definitely/not/here.json"));
        assert!(matches!(res, Err(ConfigError::Io { .. })));
    }
}
