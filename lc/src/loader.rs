//! Loop specification loader
//!
//! Reads every `*.json` file in a loops directory. Files that cannot be read
//! or parsed are logged and skipped, so one bad spec never hides the rest.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::domain::LoopSpec;

/// Timestamp encoded in a `<loop_id>_YYYYMMDD_HHMMSS` file stem
fn stem_timestamp(stem: &str) -> Option<NaiveDateTime> {
    let (head, time) = stem.rsplit_once('_')?;
    let (_, date) = head.rsplit_once('_')?;
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if date.len() != 8 || time.len() != 6 || !all_digits(date) || !all_digits(time) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), "%Y%m%d_%H%M%S").ok()
}

/// Sort key: stem timestamp, else modification time
fn file_timestamp(path: &Path) -> NaiveDateTime {
    if let Some(ts) = path.file_stem().and_then(|s| s.to_str()).and_then(stem_timestamp) {
        return ts;
    }
    match path.metadata().and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Local>::from(modified).naive_local(),
        Err(e) => {
            debug!(?path, error = %e, "file_timestamp: no modification time");
            NaiveDateTime::MIN
        }
    }
}

/// Load a single loop specification file
pub fn load_loop_spec(path: impl AsRef<Path>) -> Result<LoopSpec> {
    let path = path.as_ref();
    debug!(?path, "load_loop_spec: called");
    let content = std::fs::read_to_string(path).context("Failed to read loop spec")?;
    let mut spec = LoopSpec::from_json(&content).context("Failed to parse loop spec")?;
    spec.source = Some(path.to_path_buf());
    Ok(spec)
}

/// Load every loop specification in `loops_dir`, newest first
///
/// A missing directory yields an empty list.
pub fn load_loop_specs(loops_dir: impl AsRef<Path>) -> Result<Vec<LoopSpec>> {
    let loops_dir = loops_dir.as_ref();
    debug!(?loops_dir, "load_loop_specs: called");

    if !loops_dir.is_dir() {
        info!("No loop specifications found in {}", loops_dir.display());
        return Ok(Vec::new());
    }

    let pattern = format!("{}/*.json", glob::Pattern::escape(&loops_dir.to_string_lossy()));
    let paths: Vec<PathBuf> = glob::glob(&pattern)
        .context(format!("Invalid loops directory: {}", loops_dir.display()))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "load_loop_specs: unreadable entry");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();

    let mut loaded: Vec<(NaiveDateTime, LoopSpec)> = Vec::with_capacity(paths.len());
    for path in paths {
        match load_loop_spec(&path) {
            Ok(spec) => loaded.push((file_timestamp(&path), spec)),
            Err(e) => warn!("Skipping loop spec {}: {:#}", path.display(), e),
        }
    }

    loaded.sort_by(|a, b| b.0.cmp(&a.0));
    info!(count = loaded.len(), dir = %loops_dir.display(), "Loaded loop specifications");
    Ok(loaded.into_iter().map(|(_, spec)| spec).collect())
}
