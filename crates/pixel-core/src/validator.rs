//! Live Pixel Validator
//!
//! Classifies each observed event against a [`CompiledTrie`]:
//!
//! ```text
//! start -> prefix lookup -> version check -> param/suffix check
//!       -> PASSED | FAILED | OLD_APP_VERSION | UNDOCUMENTED
//! ```
//!
//! The validator owns the run's accumulators: the set of distinct
//! undocumented pixel names (unbounded, one entry per distinct name) and a
//! prefix -> descriptor -> example-set mapping whose example sets are
//! capped. Nothing is process-global; create one validator per run, or one
//! per worker and [`LivePixelValidator::merge`] them afterwards.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event::{parse_params, ParamToken};
use crate::schema::{Violation, ViolationKind};
use crate::tokenizer::{CompiledTrie, PixelFamily};
use crate::version::AppVersion;

pub const DEFAULT_EXAMPLE_CAP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Undocumented,
    OldAppVersion,
    ValidationFailed,
    ValidationPassed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Undocumented => "UNDOCUMENTED",
            Self::OldAppVersion => "OLD_APP_VERSION",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::ValidationPassed => "VALIDATION_PASSED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorExample {
    pub descriptor: String,
    pub example: String,
}

impl From<Violation> for ErrorExample {
    fn from(v: Violation) -> Self {
        Self {
            descriptor: v.descriptor(),
            example: v.example,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub kind: Outcome,
    /// Matched family, empty when undocumented
    pub prefix: String,
    pub owners: BTreeSet<String>,
    /// Non-empty only for `ValidationFailed`
    pub errors: Vec<ErrorExample>,
}

impl ValidationOutcome {
    fn undocumented() -> Self {
        Self {
            kind: Outcome::Undocumented,
            prefix: String::new(),
            owners: BTreeSet::new(),
            errors: Vec::new(),
        }
    }

    fn for_family(kind: Outcome, family: &PixelFamily, errors: Vec<ErrorExample>) -> Self {
        Self {
            kind,
            prefix: family.prefix.clone(),
            owners: family.owners.clone(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleCap {
    Limit(usize),
    KeepAll,
}

impl Default for ExampleCap {
    fn default() -> Self {
        Self::Limit(DEFAULT_EXAMPLE_CAP)
    }
}

impl ExampleCap {
    fn admits(&self, current: usize) -> bool {
        match self {
            Self::Limit(max) => current < *max,
            Self::KeepAll => true,
        }
    }
}

/// prefix -> descriptor -> examples
pub type PixelErrors = BTreeMap<String, BTreeMap<String, BTreeSet<String>>>;

pub struct LivePixelValidator<'t> {
    trie: &'t CompiledTrie,
    /// Parameter carrying the app version when the event has no explicit one
    version_key: Option<String>,
    cap: ExampleCap,
    undocumented: BTreeSet<String>,
    errors: PixelErrors,
}

impl<'t> LivePixelValidator<'t> {
    pub fn new(trie: &'t CompiledTrie) -> Self {
        Self {
            trie,
            version_key: None,
            cap: ExampleCap::default(),
            undocumented: BTreeSet::new(),
            errors: PixelErrors::new(),
        }
    }

    pub fn with_version_key(mut self, key: impl Into<String>) -> Self {
        self.version_key = Some(key.into());
        self
    }

    pub fn with_example_cap(mut self, cap: ExampleCap) -> Self {
        self.cap = cap;
        self
    }

    /// Validate one event. `version` is the explicit version column, if the
    /// export has one; otherwise the version parameter is consulted.
    pub fn validate_pixel(
        &mut self,
        pixel: &str,
        params: &str,
        version: Option<&str>,
    ) -> ValidationOutcome {
        let trie = self.trie;
        let name: Cow<'_, str> = if trie.lower_case() {
            Cow::Owned(pixel.to_lowercase())
        } else {
            Cow::Borrowed(pixel)
        };

        let found = trie.longest_prefix(&name);
        let Some(family) = found.family else {
            trace!(pixel, "undocumented");
            self.undocumented.insert(name.into_owned());
            return ValidationOutcome::undocumented();
        };

        let mut violations = Vec::new();
        let parsed = parse_params(params);

        if let Some(floor) = &family.min_version {
            let token = version
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(Cow::Borrowed)
                .or_else(|| self.version_param(parsed.as_deref().unwrap_or_default()));

            if let Some(token) = token {
                match AppVersion::parse(&token) {
                    Ok(observed) if observed < *floor => {
                        return ValidationOutcome::for_family(
                            Outcome::OldAppVersion,
                            family,
                            Vec::new(),
                        );
                    }
                    Ok(_) => {}
                    Err(e) => violations.push(Violation::new(
                        ViolationKind::MalformedEvent,
                        e.to_string(),
                    )),
                }
            }
        }

        match &parsed {
            Ok(tokens) => violations.extend(family.schema.check(found.remainder, tokens)),
            Err(e) => violations.push(Violation::new(ViolationKind::MalformedEvent, e.to_string())),
        }

        if violations.is_empty() {
            return ValidationOutcome::for_family(Outcome::ValidationPassed, family, Vec::new());
        }

        let errors: Vec<ErrorExample> = violations.into_iter().map(ErrorExample::from).collect();
        self.record(&family.prefix, &errors);
        ValidationOutcome::for_family(Outcome::ValidationFailed, family, errors)
    }

    fn version_param<'a>(&self, tokens: &'a [ParamToken]) -> Option<Cow<'a, str>> {
        let key = self.version_key.as_deref()?;
        let lower_case = self.trie.lower_case();
        tokens
            .iter()
            .find(|t| {
                if lower_case {
                    t.key.eq_ignore_ascii_case(key)
                } else {
                    t.key == key
                }
            })
            .map(|t| Cow::Borrowed(t.value.as_str()))
    }

    fn record(&mut self, prefix: &str, errors: &[ErrorExample]) {
        let by_descriptor = self.errors.entry(prefix.to_string()).or_default();
        for error in errors {
            let examples = by_descriptor.entry(error.descriptor.clone()).or_default();
            if !examples.contains(&error.example) && self.cap.admits(examples.len()) {
                examples.insert(error.example.clone());
            }
        }
    }

    pub fn undocumented_pixels(&self) -> &BTreeSet<String> {
        &self.undocumented
    }

    pub fn pixel_errors(&self) -> &PixelErrors {
        &self.errors
    }

    /// Fold another validator's accumulators (e.g. a worker's) into this one.
    pub fn merge(&mut self, other: LivePixelValidator<'_>) {
        self.undocumented.extend(other.undocumented);
        for (prefix, descriptors) in other.errors {
            for (descriptor, examples) in descriptors {
                let errors: Vec<ErrorExample> = examples
                    .into_iter()
                    .map(|example| ErrorExample {
                        descriptor: descriptor.clone(),
                        example,
                    })
                    .collect();
                self.record(&prefix, &errors);
            }
        }
    }

    pub fn into_results(self) -> (BTreeSet<String>, PixelErrors) {
        (self.undocumented, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CompileContext;
    use crate::tokenizer::Tokenizer;
    use serde_json::json;

    fn compile(defs: serde_json::Value) -> CompiledTrie {
        let mut t = Tokenizer::default();
        t.add_source("defs.json", &defs).unwrap();
        t.compile(&CompileContext::default()).unwrap()
    }

    #[test]
    fn test_example_scenario() {
        let trie = compile(json!({
            "app.click": { "owners": ["teamA"], "parameters": [{ "key": "id", "required": true }] }
        }));
        let mut v = LivePixelValidator::new(&trie);
        let outcome = v.validate_pixel("app.click.extra", "id=123", None);
        assert_eq!(outcome.kind, Outcome::ValidationPassed);
        assert_eq!(outcome.prefix, "app.click");
        assert!(outcome.owners.contains("teamA"));
        assert!(v.pixel_errors().is_empty());
    }

    #[test]
    fn test_undocumented() {
        let trie = compile(json!({ "app.click": { "owners": ["a"] } }));
        let mut v = LivePixelValidator::new(&trie);
        for name in ["other.click", "app", "app.view", ""] {
            let outcome = v.validate_pixel(name, "", None);
            assert_eq!(outcome.kind, Outcome::Undocumented, "{}", name);
            assert_eq!(outcome.prefix, "");
        }
        assert!(v.undocumented_pixels().contains("app.view"));
        assert_eq!(v.undocumented_pixels().len(), 4);
    }

    #[test]
    fn test_pass_and_fail_with_required() {
        let trie = compile(json!({
            "app.click": {
                "owners": ["teamA"],
                "parameters": [{ "key": "x", "enum": ["1"] }, { "key": "y", "required": true }]
            }
        }));
        let mut v = LivePixelValidator::new(&trie);
        assert_eq!(
            v.validate_pixel("app.click", "x=1&y=2", None).kind,
            Outcome::ValidationPassed
        );

        let failed = v.validate_pixel("app.click", "x=1", None);
        assert_eq!(failed.kind, Outcome::ValidationFailed);
        assert_eq!(failed.errors.len(), 1);
        assert!(failed.errors[0].descriptor.contains("'y'"));
    }

    #[test]
    fn test_version_gating() {
        let trie = compile(json!({
            "app.click": {
                "owners": ["teamA"],
                "minVersion": "2.0.0",
                "parameters": [{ "key": "id", "required": true }]
            }
        }));
        let mut v = LivePixelValidator::new(&trie).with_version_key("appVersion");

        // Old version wins over broken parameters
        let old = v.validate_pixel("app.click", "garbage=1", Some("1.9.9"));
        assert_eq!(old.kind, Outcome::OldAppVersion);
        assert_eq!(old.prefix, "app.click");

        let exact = v.validate_pixel("app.click", "id=1", Some("2.0.0"));
        assert_eq!(exact.kind, Outcome::ValidationPassed);

        let from_param = v.validate_pixel("app.click", "appVersion=1.2", None);
        assert_eq!(from_param.kind, Outcome::OldAppVersion);

        let bad = v.validate_pixel("app.click", "id=1", Some("banana"));
        assert_eq!(bad.kind, Outcome::ValidationFailed);
        assert_eq!(bad.errors[0].descriptor, "malformed event");
    }

    #[test]
    fn test_optional_param_version_gates_family() {
        let trie = compile(json!({
            "app.click": {
                "owners": ["teamA"],
                "parameters": [{ "key": "newParam", "minVersion": "9.0.0" }]
            }
        }));
        let mut v = LivePixelValidator::new(&trie);
        assert_eq!(
            v.validate_pixel("app.click", "", Some("1.0.0")).kind,
            Outcome::OldAppVersion
        );
        assert_eq!(
            v.validate_pixel("app.click", "newParam=x", Some("9.0.0")).kind,
            Outcome::ValidationPassed
        );
    }

    #[test]
    fn test_force_lower_case() {
        let mut t = Tokenizer::default();
        t.add_source(
            "defs.json",
            &json!({
                "App.Click": { "owners": ["teamA"], "parameters": [{ "key": "id", "required": true }] }
            }),
        )
        .unwrap();
        let ctx = CompileContext {
            force_lower_case: true,
            ..Default::default()
        };
        let trie = t.compile(&ctx).unwrap();
        let mut v = LivePixelValidator::new(&trie);

        let outcome = v.validate_pixel("APP.click.Extra", "ID=1", None);
        assert_eq!(outcome.kind, Outcome::ValidationPassed);
        assert!(outcome.owners.contains("teamA"));

        let unknown = v.validate_pixel("Other.Thing", "", None);
        assert_eq!(unknown.kind, Outcome::Undocumented);
        let names: Vec<&str> = v.undocumented_pixels().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["other.thing"]);
    }

    #[test]
    fn test_malformed_params_recorded_not_fatal() {
        let trie = compile(json!({ "app.click": { "owners": ["a"] } }));
        let mut v = LivePixelValidator::new(&trie);
        let outcome = v.validate_pixel("app.click", "[\"x=1\"", None);
        assert_eq!(outcome.kind, Outcome::ValidationFailed);
        assert!(v.pixel_errors()["app.click"].contains_key("malformed event"));

        // The next event is unaffected
        let ok = v.validate_pixel("app.click", "anything=1", None);
        assert_eq!(ok.kind, Outcome::ValidationFailed);
        assert_eq!(ok.errors[0].descriptor, "undocumented parameter 'anything'");
    }

    #[test]
    fn test_examples_are_capped() {
        let trie = compile(json!({ "app.click": { "owners": ["a"] } }));
        let mut capped = LivePixelValidator::new(&trie);
        let mut all = LivePixelValidator::new(&trie).with_example_cap(ExampleCap::KeepAll);
        for i in 0..20 {
            let params = format!("p=v{}", i);
            capped.validate_pixel("app.click", &params, None);
            all.validate_pixel("app.click", &params, None);
        }
        let descriptor = "undocumented parameter 'p'";
        assert_eq!(capped.pixel_errors()["app.click"][descriptor].len(), DEFAULT_EXAMPLE_CAP);
        assert_eq!(all.pixel_errors()["app.click"][descriptor].len(), 20);
    }

    #[test]
    fn test_idempotent_outcomes() {
        let trie = compile(json!({ "app.click": { "owners": ["a"] } }));
        let mut v = LivePixelValidator::new(&trie);
        let first = v.validate_pixel("app.click", "p=1", None);
        let second = v.validate_pixel("app.click", "p=1", None);
        assert_eq!(first, second);
        assert_eq!(v.pixel_errors()["app.click"]["undocumented parameter 'p'"].len(), 1);
    }

    #[test]
    fn test_merge_worker_results() {
        let trie = compile(json!({ "app.click": { "owners": ["a"] } }));
        let mut a = LivePixelValidator::new(&trie);
        let mut b = LivePixelValidator::new(&trie);
        a.validate_pixel("nope.one", "", None);
        b.validate_pixel("nope.two", "", None);
        b.validate_pixel("app.click", "p=1", None);
        a.merge(b);
        assert_eq!(a.undocumented_pixels().len(), 2);
        assert!(a.pixel_errors().contains_key("app.click"));
    }
}
