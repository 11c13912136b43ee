//! Params/Suffix Schema Compiler
//!
//! Turns declared parameter and suffix specs into matchers that are built
//! once per pixel family and reused for every event matching that family.
//! All regexes are compiled here; the per-event path only evaluates them.
//!
//! Compile-time problems (bad regex, bad bounds) surface as
//! [`PixelError::DefinitionFormat`]. Problems with an event surface as
//! [`Violation`]s, which are data, not errors.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::definition::{ExperimentGate, NamedSpecs, ParamSpec, SuffixSpec, ValueType};
use crate::error::{PixelError, Result};
use crate::event::ParamToken;
use crate::version::AppVersion;

// =============================================================================
// COMPILE CONTEXT
// =============================================================================

/// Experiment variants enabled for a run. Resolved once from product
/// configuration, never per event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentContext {
    enabled: BTreeMap<String, BTreeSet<String>>,
}

impl ExperimentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, experiment: impl Into<String>, variant: impl Into<String>) {
        self.enabled
            .entry(experiment.into())
            .or_default()
            .insert(variant.into());
    }

    pub fn is_active(&self, gate: &ExperimentGate) -> bool {
        self.enabled
            .get(&gate.id)
            .map(|variants| gate.variants.iter().any(|v| variants.contains(v)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Everything the compiler needs besides the pixel's own specs.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    /// Always allowed on every pixel; also the shortcut catalog
    pub common_params: NamedSpecs<ParamSpec>,
    /// Allowed as trailing segments after the declared suffixes
    pub common_suffixes: NamedSpecs<SuffixSpec>,
    /// Global and product ignore lists, already combined
    pub ignore_params: BTreeSet<String>,
    pub force_lower_case: bool,
    pub experiments: ExperimentContext,
    /// Product-wide minimum app version
    pub min_version: Option<AppVersion>,
}

impl CompileContext {
    pub fn ignore<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_params.extend(params.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// VIOLATIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    UnknownParameter(String),
    InvalidValue { key: String, expected: String },
    MissingRequired(String),
    InvalidSuffix { position: usize, expected: String },
    UnexpectedSuffix,
    MalformedEvent,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParameter(key) => write!(f, "undocumented parameter '{}'", key),
            Self::InvalidValue { key, expected } => {
                write!(f, "invalid value for '{}': {}", key, expected)
            }
            Self::MissingRequired(key) => write!(f, "missing required parameter '{}'", key),
            Self::InvalidSuffix { position, expected } => {
                write!(f, "invalid suffix at position {}: expected {}", position, expected)
            }
            Self::UnexpectedSuffix => write!(f, "unexpected suffix segments"),
            Self::MalformedEvent => write!(f, "malformed event"),
        }
    }
}

/// One rule broken by one event, with the raw value that broke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub example: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, example: impl Into<String>) -> Self {
        Self {
            kind,
            example: example.into(),
        }
    }

    pub fn descriptor(&self) -> String {
        self.kind.to_string()
    }
}

// =============================================================================
// VALUE MATCHING
// =============================================================================

#[derive(Debug, Clone)]
struct ValueMatcher {
    allowed: Option<HashSet<String>>,
    pattern: Option<(String, Regex)>,
    value_type: Option<ValueType>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

struct ValueRule<'a> {
    literal: Option<&'a str>,
    allowed: &'a [String],
    pattern: Option<&'a str>,
    value_type: Option<ValueType>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl ValueMatcher {
    fn compile(rule: ValueRule<'_>, lower_case: bool, pixel: &str) -> Result<Self> {
        let fold = |s: &str| {
            if lower_case {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };

        let mut allowed: Option<HashSet<String>> = None;
        if let Some(literal) = rule.literal {
            allowed = Some(std::iter::once(fold(literal)).collect());
        }
        if !rule.allowed.is_empty() {
            allowed
                .get_or_insert_with(HashSet::new)
                .extend(rule.allowed.iter().map(|v| fold(v)));
        }

        let pattern = match rule.pattern {
            Some(p) => Some((p.to_string(), anchored(p, lower_case, pixel)?)),
            None => None,
        };

        if let (Some(min), Some(max)) = (rule.minimum, rule.maximum) {
            if min > max {
                return Err(PixelError::definition(
                    pixel,
                    format!("minimum {} exceeds maximum {}", min, max),
                ));
            }
        }

        Ok(Self {
            allowed,
            pattern,
            value_type: rule.value_type,
            minimum: rule.minimum,
            maximum: rule.maximum,
        })
    }

    /// Returns the unmet expectation, if any
    fn check(&self, value: &str) -> Option<String> {
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                let mut values: Vec<&str> = allowed.iter().map(String::as_str).collect();
                values.sort_unstable();
                return Some(format!("expected one of [{}]", values.join(", ")));
            }
        }

        if let Some((source, regex)) = &self.pattern {
            if !regex.is_match(value) {
                return Some(format!("expected to match /{}/", source));
            }
        }

        match self.value_type {
            Some(ValueType::Integer) if value.parse::<i64>().is_err() => {
                return Some("expected integer".to_string())
            }
            Some(ValueType::Number) if !value.parse::<f64>().map(f64::is_finite).unwrap_or(false) => {
                return Some("expected number".to_string())
            }
            Some(ValueType::Boolean) if value != "true" && value != "false" => {
                return Some("expected boolean".to_string())
            }
            _ => {}
        }

        if self.minimum.is_some() || self.maximum.is_some() {
            let Some(number) = value.parse::<f64>().ok().filter(|n| n.is_finite()) else {
                return Some("expected number".to_string());
            };
            if let Some(min) = self.minimum {
                if number < min {
                    return Some(format!("expected >= {}", min));
                }
            }
            if let Some(max) = self.maximum {
                if number > max {
                    return Some(format!("expected <= {}", max));
                }
            }
        }

        None
    }
}

fn anchored(pattern: &str, case_insensitive: bool, pixel: &str) -> Result<Regex> {
    RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| PixelError::definition(pixel, format!("invalid pattern '{}': {}", pattern, e)))
}

// =============================================================================
// PARAMS MATCHER
// =============================================================================

#[derive(Debug, Clone)]
struct CompiledParam {
    label: String,
    key_regex: Option<Regex>,
    required: bool,
    value: ValueMatcher,
}

#[derive(Debug, Clone, Default)]
pub struct ParamsMatcher {
    params: Vec<CompiledParam>,
    by_key: HashMap<String, usize>,
    patterned: Vec<usize>,
    required: Vec<usize>,
    ignore: HashSet<String>,
    lower_case: bool,
    version_floor: Option<AppVersion>,
}

impl ParamsMatcher {
    /// Every violation in the token set, in token order, then missing
    /// required parameters in declaration order.
    pub fn check(&self, tokens: &[ParamToken]) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut present: HashSet<String> = HashSet::new();

        for token in tokens {
            let token: Cow<'_, ParamToken> = if self.lower_case {
                Cow::Owned(token.to_lowercase())
            } else {
                Cow::Borrowed(token)
            };

            if self.ignore.contains(&token.key) {
                continue;
            }

            match self.lookup(&token.key) {
                Some(param) => {
                    if let Some(expected) = param.value.check(&token.value) {
                        violations.push(Violation::new(
                            ViolationKind::InvalidValue {
                                key: param.label.clone(),
                                expected,
                            },
                            token.value.clone(),
                        ));
                    }
                }
                None => violations.push(Violation::new(
                    ViolationKind::UnknownParameter(token.key.clone()),
                    token.raw(),
                )),
            }

            present.insert(token.key.clone());
        }

        for &idx in &self.required {
            let param = &self.params[idx];
            if !present.contains(param.label.as_str()) {
                violations.push(Violation::new(
                    ViolationKind::MissingRequired(param.label.clone()),
                    tokens
                        .iter()
                        .map(ParamToken::raw)
                        .collect::<Vec<_>>()
                        .join("&"),
                ));
            }
        }

        violations
    }

    fn lookup(&self, key: &str) -> Option<&CompiledParam> {
        if let Some(&idx) = self.by_key.get(key) {
            return Some(&self.params[idx]);
        }
        self.patterned
            .iter()
            .map(|&idx| &self.params[idx])
            .find(|p| p.key_regex.as_ref().is_some_and(|re| re.is_match(key)))
    }

    /// Highest `minVersion` among the family's parameters
    pub fn version_floor(&self) -> Option<&AppVersion> {
        self.version_floor.as_ref()
    }

    fn raise_floor(&mut self, floor: Option<&AppVersion>) {
        if let Some(floor) = floor {
            if self.version_floor.as_ref().map_or(true, |f| floor > f) {
                self.version_floor = Some(floor.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Compile parameter specs for one pixel family.
///
/// `specs` must already be ordered most-specific first (own specs, then
/// ancestors nearest first); the first declaration of a key wins. Common
/// parameters from `ctx` are appended after them. Specs gated on an
/// experiment that is not enabled in `ctx` are dropped.
pub fn compile_params_schema(
    pixel: &str,
    specs: &[ParamSpec],
    ctx: &CompileContext,
) -> Result<ParamsMatcher> {
    let lower_case = ctx.force_lower_case;
    let fold = |s: &str| {
        if lower_case {
            s.to_lowercase()
        } else {
            s.to_string()
        }
    };

    let mut matcher = ParamsMatcher {
        ignore: ctx.ignore_params.iter().map(|k| fold(k)).collect(),
        lower_case,
        ..Default::default()
    };

    for spec in specs.iter().chain(ctx.common_params.values()) {
        if let Some(gate) = &spec.experiment {
            if !ctx.experiments.is_active(gate) {
                continue;
            }
        }

        let value = ValueMatcher::compile(
            ValueRule {
                literal: None,
                allowed: &spec.allowed,
                pattern: spec.pattern.as_deref(),
                value_type: spec.value_type,
                minimum: spec.minimum,
                maximum: spec.maximum,
            },
            lower_case,
            pixel,
        )?;

        let idx = matcher.params.len();
        match (&spec.key, &spec.key_pattern) {
            (Some(key), _) => {
                let key = fold(key);
                if matcher.by_key.contains_key(&key) {
                    continue;
                }
                matcher.by_key.insert(key.clone(), idx);
                if !matcher.ignore.contains(&key) {
                    if spec.required {
                        matcher.required.push(idx);
                    }
                    matcher.raise_floor(spec.min_version.as_ref());
                }
                matcher.params.push(CompiledParam {
                    label: key,
                    key_regex: None,
                    required: spec.required,
                    value,
                });
            }
            (None, Some(pattern)) => {
                matcher.patterned.push(idx);
                matcher.raise_floor(spec.min_version.as_ref());
                matcher.params.push(CompiledParam {
                    label: pattern.clone(),
                    key_regex: Some(anchored(pattern, lower_case, pixel)?),
                    required: false,
                    value,
                });
            }
            (None, None) => {
                return Err(PixelError::definition(
                    pixel,
                    "parameter needs either key or keyPattern",
                ))
            }
        }
    }

    debug_assert!(matcher
        .required
        .iter()
        .all(|&idx| matcher.params[idx].required));

    Ok(matcher)
}

// =============================================================================
// SUFFIXES MATCHER
// =============================================================================

#[derive(Debug, Clone)]
pub struct SegmentMatcher {
    label: String,
    value: ValueMatcher,
}

impl SegmentMatcher {
    fn compile(spec: &SuffixSpec, pixel: &str) -> Result<Self> {
        let value = ValueMatcher::compile(
            ValueRule {
                literal: spec.key.as_deref(),
                allowed: &spec.allowed,
                pattern: spec.pattern.as_deref(),
                value_type: spec.value_type,
                minimum: None,
                maximum: None,
            },
            true,
            pixel,
        )?;
        Ok(Self {
            label: spec.label(),
            value,
        })
    }

    fn matches(&self, segment: &str) -> bool {
        self.value.check(segment).is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub enum SuffixesMatcher {
    /// No suffix declared anywhere up the path
    #[default]
    AcceptAny,
    Positional {
        declared: Vec<SegmentMatcher>,
        common: Vec<SegmentMatcher>,
    },
}

impl SuffixesMatcher {
    /// Check the unmatched trailing path (without its leading dot).
    ///
    /// Trailing segments matching a common suffix are set aside first; the
    /// rest must match the declared suffixes position by position. Declared
    /// positions may be left unfilled from the end.
    pub fn check(&self, remainder: &str) -> Option<Violation> {
        let Self::Positional { declared, common } = self else {
            return None;
        };
        if remainder.is_empty() {
            return None;
        }

        let lowered = remainder.to_lowercase();
        let mut segments: Vec<&str> = lowered.split('.').collect();
        while let Some(last) = segments.last() {
            if common.iter().any(|c| c.matches(last)) {
                segments.pop();
            } else {
                break;
            }
        }

        if segments.len() > declared.len() {
            return Some(Violation::new(
                ViolationKind::UnexpectedSuffix,
                remainder.to_string(),
            ));
        }

        segments
            .iter()
            .zip(declared)
            .enumerate()
            .find(|(_, (segment, matcher))| !matcher.matches(segment))
            .map(|(position, (_, matcher))| {
                Violation::new(
                    ViolationKind::InvalidSuffix {
                        position,
                        expected: matcher.label.clone(),
                    },
                    remainder.to_string(),
                )
            })
    }

    pub fn matches(&self, remainder: &str) -> bool {
        self.check(remainder).is_none()
    }
}

/// Compile suffix specs for one pixel family. With nothing declared any
/// suffix (or none) is accepted.
pub fn compile_suffixes_schema(
    pixel: &str,
    specs: &[SuffixSpec],
    ctx: &CompileContext,
) -> Result<SuffixesMatcher> {
    if specs.is_empty() {
        return Ok(SuffixesMatcher::AcceptAny);
    }

    let declared = specs
        .iter()
        .map(|s| SegmentMatcher::compile(s, pixel))
        .collect::<Result<Vec<_>>>()?;
    let common = ctx
        .common_suffixes
        .values()
        .map(|s| SegmentMatcher::compile(s, pixel))
        .collect::<Result<Vec<_>>>()?;

    Ok(SuffixesMatcher::Positional { declared, common })
}

// =============================================================================
// COMPILED SCHEMA
// =============================================================================

/// Immutable per-family schema, built once at compile time.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    pub params: ParamsMatcher,
    pub suffixes: SuffixesMatcher,
}

impl CompiledSchema {
    pub fn compile(
        pixel: &str,
        params: &[ParamSpec],
        suffixes: &[SuffixSpec],
        ctx: &CompileContext,
    ) -> Result<Self> {
        Ok(Self {
            params: compile_params_schema(pixel, params, ctx)?,
            suffixes: compile_suffixes_schema(pixel, suffixes, ctx)?,
        })
    }

    /// Suffix violation first, then parameter violations.
    pub fn check(&self, remainder: &str, tokens: &[ParamToken]) -> Vec<Violation> {
        let mut violations: Vec<Violation> = self.suffixes.check(remainder).into_iter().collect();
        violations.extend(self.params.check(tokens));
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_params;

    fn tokens(raw: &str) -> Vec<ParamToken> {
        parse_params(raw).unwrap()
    }

    fn kinds(violations: &[Violation]) -> Vec<String> {
        violations.iter().map(Violation::descriptor).collect()
    }

    #[test]
    fn test_required_and_allowed() {
        let specs = vec![
            ParamSpec::named("x").with_enum(["1"]),
            ParamSpec::named("y").required(),
        ];
        let m = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();

        assert!(m.check(&tokens("x=1&y=2")).is_empty());

        let missing = m.check(&tokens("x=1"));
        assert_eq!(kinds(&missing), vec!["missing required parameter 'y'"]);
        assert_eq!(missing[0].example, "x=1");
    }

    #[test]
    fn test_collects_all_violations() {
        let specs = vec![
            ParamSpec::named("x").with_enum(["1"]),
            ParamSpec::named("y").required(),
        ];
        let m = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();
        let v = m.check(&tokens("x=2&z=3"));
        assert_eq!(
            kinds(&v),
            vec![
                "invalid value for 'x': expected one of [1]",
                "undocumented parameter 'z'",
                "missing required parameter 'y'",
            ]
        );
        assert_eq!(v[0].example, "2");
        assert_eq!(v[1].example, "z=3");
    }

    #[test]
    fn test_ignore_params_never_violate() {
        let specs = vec![ParamSpec::named("y").required()];
        let ctx = CompileContext::default().ignore(["cache", "y"]);
        let m = compile_params_schema("p", &specs, &ctx).unwrap();
        assert!(m.check(&tokens("cache=123")).is_empty());
    }

    #[test]
    fn test_common_params_always_allowed() {
        let mut ctx = CompileContext::default();
        ctx.common_params
            .insert("appVersion".into(), ParamSpec::named("appVersion"));
        let m = compile_params_schema("p", &[], &ctx).unwrap();
        assert!(m.check(&tokens("appVersion=1.2.3")).is_empty());
    }

    #[test]
    fn test_first_declaration_wins() {
        let specs = vec![
            ParamSpec::named("mode").with_enum(["new"]),
            ParamSpec::named("mode").with_enum(["old"]).required(),
        ];
        let m = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();
        assert!(m.check(&tokens("mode=new")).is_empty());
        assert!(m.check(&[]).is_empty());
    }

    #[test]
    fn test_key_pattern_and_types() {
        let specs = vec![
            ParamSpec {
                key_pattern: Some(r"slot_\d+".into()),
                value_type: Some(ValueType::Integer),
                ..Default::default()
            },
            ParamSpec {
                key: Some("ratio".into()),
                value_type: Some(ValueType::Number),
                minimum: Some(0.0),
                maximum: Some(1.0),
                ..Default::default()
            },
            ParamSpec {
                key: Some("on".into()),
                value_type: Some(ValueType::Boolean),
                ..Default::default()
            },
        ];
        let m = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();
        assert!(m.check(&tokens("slot_1=4&slot_22=5&ratio=0.5&on=true")).is_empty());
        assert_eq!(
            kinds(&m.check(&tokens("slot_1=x&ratio=2&on=yes&slotx=1"))),
            vec![
                "invalid value for 'slot_\\d+': expected integer",
                "invalid value for 'ratio': expected <= 1",
                "invalid value for 'on': expected boolean",
                "undocumented parameter 'slotx'",
            ]
        );
    }

    #[test]
    fn test_pattern_is_anchored() {
        let specs = vec![ParamSpec {
            key: Some("id".into()),
            pattern: Some("[a-f0-9]+".into()),
            ..Default::default()
        }];
        let m = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();
        assert!(m.check(&tokens("id=abc123")).is_empty());
        assert_eq!(m.check(&tokens("id=xyz-abc")).len(), 1);
    }

    #[test]
    fn test_bad_regex_is_definition_error() {
        let specs = vec![ParamSpec {
            key: Some("id".into()),
            pattern: Some("([".into()),
            ..Default::default()
        }];
        let err = compile_params_schema("app.click", &specs, &CompileContext::default()).unwrap_err();
        assert!(matches!(err, PixelError::DefinitionFormat { pixel, .. } if pixel == "app.click"));
    }

    #[test]
    fn test_force_lower_case() {
        let specs = vec![ParamSpec::named("Mode").with_enum(["Dark"])];
        let ctx = CompileContext {
            force_lower_case: true,
            ..Default::default()
        };
        let m = compile_params_schema("p", &specs, &ctx).unwrap();
        assert!(m.check(&tokens("MODE=dark")).is_empty());

        let strict = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();
        assert_eq!(strict.check(&tokens("mode=Dark")).len(), 1);
    }

    #[test]
    fn test_experiment_gating() {
        let gated = ParamSpec {
            key: Some("variantParam".into()),
            required: true,
            experiment: Some(ExperimentGate {
                id: "exp1".into(),
                variants: vec!["treatment".into()],
            }),
            ..Default::default()
        };

        let off = compile_params_schema("p", &[gated.clone()], &CompileContext::default()).unwrap();
        assert!(off.check(&[]).is_empty());
        assert_eq!(
            kinds(&off.check(&tokens("variantParam=1"))),
            vec!["undocumented parameter 'variantParam'"]
        );

        let mut ctx = CompileContext::default();
        ctx.experiments.enable("exp1", "treatment");
        let on = compile_params_schema("p", &[gated], &ctx).unwrap();
        assert!(on.check(&tokens("variantParam=1")).is_empty());
        assert_eq!(on.check(&[]).len(), 1);
    }

    #[test]
    fn test_bounds_without_type_reject_non_finite() {
        let spec = ParamSpec {
            minimum: Some(0.0),
            maximum: Some(10.0),
            ..ParamSpec::named("n")
        };
        let m = compile_params_schema("p", &[spec], &CompileContext::default()).unwrap();
        assert!(m.check(&tokens("n=5")).is_empty());
        for bad in ["n=NaN", "n=inf", "n=-infinity"] {
            let violations = m.check(&tokens(bad));
            assert_eq!(violations.len(), 1, "{}", bad);
            assert_eq!(
                violations[0].descriptor(),
                "invalid value for 'n': expected number"
            );
        }
    }

    #[test]
    fn test_version_floor_from_any_param() {
        let specs = vec![
            ParamSpec {
                min_version: Some(AppVersion::parse("3.0").unwrap()),
                ..ParamSpec::named("a").required()
            },
            ParamSpec {
                min_version: Some(AppVersion::parse("9.0").unwrap()),
                ..ParamSpec::named("b")
            },
        ];
        let m = compile_params_schema("p", &specs, &CompileContext::default()).unwrap();
        assert_eq!(m.version_floor(), Some(&AppVersion::parse("9.0").unwrap()));

        // Ignored params do not count
        let ctx = CompileContext::default().ignore(["b"]);
        let m = compile_params_schema("p", &specs, &ctx).unwrap();
        assert_eq!(m.version_floor(), Some(&AppVersion::parse("3.0").unwrap()));
    }

    #[test]
    fn test_suffixes_accept_any_when_undeclared() {
        let m = compile_suffixes_schema("p", &[], &CompileContext::default()).unwrap();
        assert!(m.matches("extra"));
        assert!(m.matches(""));
        assert!(m.matches("a.b.c"));
    }

    #[test]
    fn test_suffixes_positional_case_insensitive() {
        let specs = vec![
            SuffixSpec::literal("phone"),
            SuffixSpec {
                allowed: vec!["daily".into(), "count".into()],
                ..Default::default()
            },
        ];
        let mut ctx = CompileContext::default();
        ctx.common_suffixes.insert(
            "unique".into(),
            SuffixSpec {
                allowed: vec!["u".into(), "d".into()],
                ..Default::default()
            },
        );
        let m = compile_suffixes_schema("p", &specs, &ctx).unwrap();

        assert!(m.matches(""));
        assert!(m.matches("PHONE"));
        assert!(m.matches("phone.Daily"));
        assert!(m.matches("phone.daily.u"));
        assert!(m.matches("d"));

        let bad = m.check("tablet.daily").unwrap();
        assert_eq!(bad.descriptor(), "invalid suffix at position 0: expected phone");
        assert_eq!(bad.example, "tablet.daily");
        assert_eq!(
            m.check("phone.daily.extra").unwrap().kind,
            ViolationKind::UnexpectedSuffix
        );
    }
}
