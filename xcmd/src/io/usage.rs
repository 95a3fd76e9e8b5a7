//! Cumulative token usage stored in `<config dir>/usage.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::io::config::write_atomic;
use crate::io::llm::TokenUsage;

/// Running totals across every model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub request_count: u64,
}

impl UsageTotals {
    pub fn add(&mut self, usage: &TokenUsage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_creation_tokens += usage.cache_creation_input_tokens.unwrap_or(0);
        self.cache_read_tokens += usage.cache_read_input_tokens.unwrap_or(0);
        self.request_count += 1;
    }

    pub fn render(&self) -> String {
        format!(
            "Requests:              {}\n\
             Input tokens:          {}\n\
             Output tokens:         {}\n\
             Cache creation tokens: {}\n\
             Cache read tokens:     {}",
            self.request_count,
            self.input_tokens,
            self.output_tokens,
            self.cache_creation_tokens,
            self.cache_read_tokens,
        )
    }
}

/// Load usage totals; a missing file yields zeros.
pub fn load_usage(path: &Path) -> Result<UsageTotals> {
    if !path.exists() {
        return Ok(UsageTotals::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read usage {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse usage {}", path.display()))
}

/// Atomically write usage totals to disk (temp file + rename).
pub fn write_usage(path: &Path, totals: &UsageTotals) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(totals).context("serialize usage")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Receives the usage block of every model response.
pub trait UsageRecorder {
    fn record(&self, usage: &TokenUsage);
}

/// Read-modify-write recorder backed by `usage.json`.
pub struct UsageFile {
    path: PathBuf,
}

impl UsageFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn try_record(&self, usage: &TokenUsage) -> Result<()> {
        let mut totals = load_usage(&self.path)?;
        totals.add(usage);
        write_usage(&self.path, &totals)?;
        debug!(request_count = totals.request_count, "usage recorded");
        Ok(())
    }
}

impl UsageRecorder for UsageFile {
    fn record(&self, usage: &TokenUsage) {
        if let Err(err) = self.try_record(usage) {
            warn!(err = %format!("{err:#}"), path = %self.path.display(), "failed to record usage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u64, output: u64, cache_read: Option<u64>) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            cache_creation_input_tokens: None,
            cache_read_input_tokens: cache_read,
        }
    }

    /// Verifies each record call accumulates onto what is already on disk.
    #[test]
    fn usage_file_accumulates_across_records() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("usage.json");
        let recorder = UsageFile::new(&path);

        recorder.record(&usage(10, 5, None));
        recorder.record(&usage(7, 3, Some(4)));

        let totals = load_usage(&path).expect("load");
        assert_eq!(
            totals,
            UsageTotals {
                input_tokens: 17,
                output_tokens: 8,
                cache_creation_tokens: 0,
                cache_read_tokens: 4,
                request_count: 2,
            }
        );
    }

    #[test]
    fn missing_usage_file_is_zero() {
        let temp = tempfile::tempdir().expect("tempdir");
        let totals = load_usage(&temp.path().join("usage.json")).expect("load");
        assert_eq!(totals, UsageTotals::default());
    }

    /// A corrupt file is reported through tracing, never as a failure.
    #[test]
    fn corrupt_usage_file_does_not_panic() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("usage.json");
        fs::write(&path, "not json").expect("write");

        UsageFile::new(&path).record(&usage(1, 1, None));
        assert_eq!(fs::read_to_string(&path).expect("read"), "not json");
    }

    #[test]
    fn render_lists_every_counter() {
        let mut totals = UsageTotals::default();
        totals.add(&usage(3, 2, None));
        let rendered = totals.render();
        assert!(rendered.contains("Requests:              1"));
        assert!(rendered.contains("Input tokens:          3"));
        assert!(rendered.contains("Output tokens:         2"));
    }
}
