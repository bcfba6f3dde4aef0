// src/persist.rs
//! Writes bucket collections as pretty-printed JSON arrays.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::{Bucket, Item};

/// Render items as the persisted document: pretty JSON array + trailing newline.
pub fn render_items(items: &[Item]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(items).context("serializing items")?;
    out.push('\n');
    Ok(out)
}

/// Write `items` to `<out_dir>/<bucket file>`, creating `out_dir` if needed.
/// An existing file is overwritten.
pub fn save_bucket(out_dir: &Path, bucket: Bucket, items: &[Item]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let path = out_dir.join(bucket.file_name());
    let body = render_items(items)?;
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(target: "persist", %bucket, path = %path.display(), items = items.len(), "bucket saved");
    Ok(path)
}
