// src/ingest/fetcher.rs
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use metrics::counter;
use std::time::Duration;
use thiserror::Error;

use crate::ingest::types::FeedFetcher;

/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
/// Largest accepted feed body.
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (+feed aggregator)"
);
const ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.5";

/// Failure to retrieve one feed. Always recovered by skipping that source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connection or TLS failure, or a broken body stream
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("response too large")]
    ResponseTooLarge,
}

/// HTTP fetcher with a bounded per-request timeout and body size.
///
/// The timeout wraps the whole request (connect, headers and body) and is
/// enforced by dropping the in-flight future. The body is read chunk by
/// chunk and abandoned as soon as it passes the size cap, whether or not
/// the server announced a `Content-Length`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body: usize,
}

impl HttpFetcher {
    pub fn new(timeout_ms: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client, timeout_ms))
    }

    pub fn with_client(client: reqwest::Client, timeout_ms: u64) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
            max_body: MAX_FEED_SIZE,
        }
    }

    /// Override the body size cap (bytes).
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    async fn fetch_inner(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        let charset = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_param);

        let bytes = read_limited_bytes(resp, self.max_body).await?;
        Ok(decode_body(&bytes, charset.as_deref()))
    }
}

async fn read_limited_bytes(
    mut resp: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: announced length
    if resp
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(FetchError::ResponseTooLarge);
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// `charset` parameter of a `Content-Type` header value.
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// `encoding="..."` from the XML declaration, if the body starts with one.
fn declared_xml_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let decl = head.trim_start_matches('\u{feff}').trim_start();
    let decl = &decl[..decl.strip_prefix("<?xml")?.find("?>")? + "<?xml".len()];
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(value[..value.find(quote)?].to_string())
}

/// Decode a feed body: a BOM wins, then the header charset, then the XML
/// declaration, then UTF-8. Invalid sequences become U+FFFD.
fn decode_body(bytes: &[u8], header_charset: Option<&str>) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| {
            // A readable declaration means an ASCII-compatible body; `output_encoding`
            // maps a mislabelled UTF-16 back to UTF-8.
            declared_xml_encoding(bytes)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
                .map(Encoding::output_encoding)
        })
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let res = match tokio::time::timeout(self.timeout, self.fetch_inner(url)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(self.timeout.as_millis() as u64)),
        };
        if res.is_err() {
            counter!("ingest_provider_errors_total").increment(1);
        }
        res
    }
}
