//! Result files
//!
//! - `undocumented_pixels.json`: sorted list of distinct undocumented names
//! - `pixel_errors.json`: prefix -> descriptor -> example values
//! - `summary.json`: outcome totals, per-prefix counts, failing owners and
//!   the declared description/triggers of every family that saw events

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pixel_core::{Outcome, PixelDefinitionNode, PixelErrors, ValidationReport};
use serde::Serialize;
use tracing::info;

use crate::live_run::LiveRunStats;

pub const UNDOCUMENTED_FILE: &str = "undocumented_pixels.json";
pub const ERRORS_FILE: &str = "pixel_errors.json";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary<'a> {
    pub generated_at: DateTime<Utc>,
    pub totals: BTreeMap<String, u64>,
    pub run: &'a LiveRunStats,
    pub report: &'a ValidationReport,
    pub families: BTreeMap<&'a str, FamilyNotes<'a>>,
}

/// Declared metadata for a family, carried through for readers of the summary
#[derive(Debug, Serialize)]
pub struct FamilyNotes<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: &'a Vec<String>,
}

impl<'a> Summary<'a> {
    pub fn new(
        report: &'a ValidationReport,
        run: &'a LiveRunStats,
        declared: &'a PixelDefinitionNode,
    ) -> Self {
        let totals = [
            Outcome::ValidationPassed,
            Outcome::ValidationFailed,
            Outcome::OldAppVersion,
            Outcome::Undocumented,
        ]
        .into_iter()
        .map(|kind| (kind.to_string(), report.count(kind)))
        .collect();

        let families = report
            .prefixes
            .keys()
            .filter_map(|prefix| {
                let definition = declared.get(prefix)?.definition.as_ref()?;
                Some((
                    prefix.as_str(),
                    FamilyNotes {
                        description: definition.description.as_deref(),
                        triggers: &definition.triggers,
                    },
                ))
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            totals,
            run,
            report,
            families,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultPaths {
    pub undocumented: PathBuf,
    pub errors: PathBuf,
    pub summary: PathBuf,
}

pub fn write_results(
    out_dir: &Path,
    undocumented: &BTreeSet<String>,
    errors: &PixelErrors,
    report: &ValidationReport,
    run: &LiveRunStats,
    declared: &PixelDefinitionNode,
) -> Result<ResultPaths> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let paths = ResultPaths {
        undocumented: out_dir.join(UNDOCUMENTED_FILE),
        errors: out_dir.join(ERRORS_FILE),
        summary: out_dir.join(SUMMARY_FILE),
    };

    write_json(&paths.undocumented, undocumented)?;
    write_json(&paths.errors, errors)?;
    write_json(&paths.summary, &Summary::new(report, run, declared))?;

    info!(
        "Wrote {} undocumented pixels and errors for {} prefixes to {}",
        undocumented.len(),
        errors.len(),
        out_dir.display()
    );
    Ok(paths)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
