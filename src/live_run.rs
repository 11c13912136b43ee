//! Streamed live validation
//!
//! Reads an exported CSV one row at a time (a single reused record buffer,
//! never the whole file), validates each row and folds the outcome into the
//! report. The cancel flag is checked between rows.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use pixel_core::{LivePixelValidator, ValidationReport};
use serde::Serialize;
use tracing::{info, warn};

const PROGRESS_EVERY: u64 = 1_000_000;

/// Column names in the export
#[derive(Debug, Clone)]
pub struct LiveColumns {
    pub pixel: String,
    pub params: String,
    /// Optional; when absent the version parameter is used
    pub version: String,
}

impl Default for LiveColumns {
    fn default() -> Self {
        Self {
            pixel: "pixel".to_string(),
            params: "params".to_string(),
            version: "version".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRunStats {
    pub rows: u64,
    /// Rows that could not be read or had no pixel name
    pub malformed_rows: u64,
    pub aborted: bool,
}

pub fn run_live_validation<R: Read>(
    input: R,
    columns: &LiveColumns,
    validator: &mut LivePixelValidator<'_>,
    report: &mut ValidationReport,
    cancel: &AtomicBool,
) -> Result<LiveRunStats> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let pixel_idx = position(&columns.pixel)
        .ok_or_else(|| anyhow!("CSV is missing the '{}' column", columns.pixel))?;
    let params_idx = position(&columns.params)
        .ok_or_else(|| anyhow!("CSV is missing the '{}' column", columns.params))?;
    let version_idx = position(&columns.version);

    let mut stats = LiveRunStats::default();
    let mut record = csv::StringRecord::new();

    loop {
        if cancel.load(Ordering::Relaxed) {
            warn!("Live validation aborted after {} rows", stats.rows);
            stats.aborted = true;
            break;
        }

        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => {
                return Err(e).with_context(|| format!("Failed to read row {}", stats.rows + 1));
            }
            Err(e) => {
                stats.rows += 1;
                stats.malformed_rows += 1;
                warn!("Skipping unreadable row {}: {}", stats.rows, e);
                continue;
            }
        }
        stats.rows += 1;

        let pixel = record.get(pixel_idx).map(str::trim).unwrap_or("");
        if pixel.is_empty() {
            stats.malformed_rows += 1;
            warn!("Row {} has no pixel name", stats.rows);
            continue;
        }
        let params = record.get(params_idx).unwrap_or("");
        let version = version_idx.and_then(|idx| record.get(idx));

        let outcome = validator.validate_pixel(pixel, params, version);
        report.fold(&outcome);

        if stats.rows % PROGRESS_EVERY == 0 {
            info!("Validated {} rows", stats.rows);
        }
    }

    info!(
        "Live validation finished: {} rows, {} undocumented, {} malformed rows",
        stats.rows, report.undocumented, stats.malformed_rows
    );
    Ok(stats)
}
