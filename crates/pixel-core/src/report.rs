//! Reporting aggregation
//!
//! Pure accumulation over [`ValidationOutcome`]s. No validation logic lives
//! here; folding the same outcome twice counts it twice.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::validator::{Outcome, ValidationOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefixStats {
    pub passed: u64,
    pub failed: u64,
    pub old_app_version: u64,
    pub owners: BTreeSet<String>,
}

impl PrefixStats {
    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.old_app_version
    }

    fn merge(&mut self, other: &PrefixStats) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.old_app_version += other.old_app_version;
        self.owners.extend(other.owners.iter().cloned());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total_events: u64,
    pub undocumented: u64,
    pub prefixes: BTreeMap<String, PrefixStats>,
    /// owner -> prefixes with at least one failure
    pub failures_by_owner: BTreeMap<String, BTreeSet<String>>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, outcome: &ValidationOutcome) {
        self.total_events += 1;

        if outcome.kind == Outcome::Undocumented {
            self.undocumented += 1;
            return;
        }

        let stats = self.prefixes.entry(outcome.prefix.clone()).or_default();
        stats.owners.extend(outcome.owners.iter().cloned());
        match outcome.kind {
            Outcome::ValidationPassed => stats.passed += 1,
            Outcome::OldAppVersion => stats.old_app_version += 1,
            Outcome::ValidationFailed => {
                stats.failed += 1;
                for owner in &outcome.owners {
                    self.failures_by_owner
                        .entry(owner.clone())
                        .or_default()
                        .insert(outcome.prefix.clone());
                }
            }
            Outcome::Undocumented => {}
        }
    }

    pub fn merge(&mut self, other: &ValidationReport) {
        self.total_events += other.total_events;
        self.undocumented += other.undocumented;
        for (prefix, stats) in &other.prefixes {
            self.prefixes.entry(prefix.clone()).or_default().merge(stats);
        }
        for (owner, prefixes) in &other.failures_by_owner {
            self.failures_by_owner
                .entry(owner.clone())
                .or_default()
                .extend(prefixes.iter().cloned());
        }
    }

    pub fn count(&self, kind: Outcome) -> u64 {
        match kind {
            Outcome::Undocumented => self.undocumented,
            Outcome::ValidationPassed => self.prefixes.values().map(|s| s.passed).sum(),
            Outcome::ValidationFailed => self.prefixes.values().map(|s| s.failed).sum(),
            Outcome::OldAppVersion => self.prefixes.values().map(|s| s.old_app_version).sum(),
        }
    }

    pub fn owners_with_failures(&self) -> BTreeSet<&str> {
        self.failures_by_owner.keys().map(String::as_str).collect()
    }
}
