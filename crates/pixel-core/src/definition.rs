//! Pixel definition types
//!
//! A definition file is a mapping from dot-delimited pixel family name to a
//! definition object:
//!
//! ```yaml
//! app.search.submit:
//!   owners: [teamA]
//!   description: Fired when the user submits a search
//!   minVersion: "7.100.0"
//!   parameters:
//!     - appVersion              # shortcut into the common parameter catalog
//!     - key: source
//!       enum: [address_bar, widget]
//!       required: true
//!     - keyPattern: "^slot_\\d+$"
//!       type: integer
//!   suffixes:
//!     - key: phone
//!     - enum: [daily, count]
//! ```
//!
//! Entries are parsed from `serde_json::Value` so that a malformed record can
//! be reported against the pixel that contains it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{PixelError, Result};
use crate::version::AppVersion;

/// Keys a definition record may carry.
const DEFINITION_FIELDS: [&str; 6] = [
    "owners",
    "description",
    "triggers",
    "minVersion",
    "parameters",
    "suffixes",
];

/// Named spec catalog (common parameters, common suffixes, ignore lists).
pub type NamedSpecs<T> = BTreeMap<String, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
}

/// Restricts a parameter to runs where one of `variants` of experiment `id`
/// is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentGate {
    pub id: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParamSpec {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Regex over parameter names, for families of numbered or dynamic keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(
        rename = "enum",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "scalar_strings"
    )]
    pub allowed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<AppVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentGate>,
}

impl ParamSpec {
    pub fn named(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Label used in violation descriptors
    pub fn label(&self) -> &str {
        self.key
            .as_deref()
            .or(self.key_pattern.as_deref())
            .unwrap_or("<unnamed>")
    }

    fn check_shape(&self, pixel: &str) -> Result<()> {
        match (&self.key, &self.key_pattern) {
            (Some(_), Some(_)) => Err(PixelError::definition(
                pixel,
                format!("parameter '{}' has both key and keyPattern", self.label()),
            )),
            (None, None) => Err(PixelError::definition(
                pixel,
                "parameter needs either key or keyPattern",
            )),
            (None, Some(pattern)) if self.required => Err(PixelError::definition(
                pixel,
                format!("keyPattern parameter '{}' cannot be required", pattern),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SuffixSpec {
    /// Literal segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(
        rename = "enum",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "scalar_strings"
    )]
    pub allowed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl SuffixSpec {
    pub fn literal(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn label(&self) -> String {
        if let Some(key) = &self.key {
            key.clone()
        } else if !self.allowed.is_empty() {
            format!("one of [{}]", self.allowed.join(", "))
        } else if let Some(pattern) = &self.pattern {
            format!("/{}/", pattern)
        } else if let Some(t) = self.value_type {
            format!("{:?}", t).to_lowercase()
        } else {
            "any".to_string()
        }
    }
}

/// One declared pixel family, with shortcuts already resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelDefinition {
    #[serde(default)]
    pub owners: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffixes: Vec<SuffixSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<AppVersion>,
}

impl PixelDefinition {
    /// Parse one catalog record.
    ///
    /// String entries in `parameters`/`suffixes` are shortcuts into the
    /// common catalogs and are replaced by the catalog spec here.
    pub fn from_value(
        pixel: &str,
        value: &Value,
        common_params: &NamedSpecs<ParamSpec>,
        common_suffixes: &NamedSpecs<SuffixSpec>,
    ) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| PixelError::definition(pixel, "definition must be an object"))?;

        if let Some(unknown) = obj.keys().find(|k| !DEFINITION_FIELDS.contains(&k.as_str())) {
            return Err(PixelError::definition(
                pixel,
                format!("unknown field '{}'", unknown),
            ));
        }

        let owners = match obj.get("owners") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| PixelError::definition(pixel, "owners must be strings"))
                })
                .collect::<Result<BTreeSet<_>>>()?,
            Some(_) => return Err(PixelError::definition(pixel, "owners must be a list")),
            None => return Err(PixelError::definition(pixel, "missing owners")),
        };

        let description = match obj.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(PixelError::definition(pixel, "description must be a string")),
        };

        let triggers = match obj.get("triggers") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|t| t.as_str().map(str::to_string).unwrap_or_else(|| t.to_string()))
                .collect(),
            Some(_) => return Err(PixelError::definition(pixel, "triggers must be a list")),
        };

        let min_version = match obj.get("minVersion") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                AppVersion::parse(s).map_err(|e| PixelError::definition(pixel, e.to_string()))?,
            ),
            Some(other) => {
                return Err(PixelError::definition(
                    pixel,
                    format!("minVersion must be a string, got {}", other),
                ))
            }
        };

        let parameters = parse_entries(pixel, obj.get("parameters"), "parameter", |entry| {
            match entry {
                Value::String(name) => common_params.get(name).cloned().ok_or_else(|| {
                    PixelError::definition(pixel, format!("unknown parameter shortcut '{}'", name))
                }),
                Value::Object(_) => {
                    let spec: ParamSpec = serde_json::from_value(entry.clone())
                        .map_err(|e| PixelError::definition(pixel, e.to_string()))?;
                    spec.check_shape(pixel)?;
                    Ok(spec)
                }
                _ => Err(PixelError::definition(
                    pixel,
                    "parameter entry must be an object or shortcut name",
                )),
            }
        })?;

        let mut seen = BTreeSet::new();
        for param in &parameters {
            if let Some(key) = &param.key {
                if !seen.insert(key.as_str()) {
                    return Err(PixelError::definition(
                        pixel,
                        format!("duplicate parameter '{}'", key),
                    ));
                }
            }
        }

        let suffixes = parse_entries(pixel, obj.get("suffixes"), "suffix", |entry| match entry {
            Value::String(name) => common_suffixes.get(name).cloned().ok_or_else(|| {
                PixelError::definition(pixel, format!("unknown suffix shortcut '{}'", name))
            }),
            Value::Object(_) => serde_json::from_value(entry.clone())
                .map_err(|e| PixelError::definition(pixel, e.to_string())),
            _ => Err(PixelError::definition(
                pixel,
                "suffix entry must be an object or shortcut name",
            )),
        })?;

        Ok(Self {
            owners,
            description,
            triggers,
            parameters,
            suffixes,
            min_version,
        })
    }
}

fn parse_entries<T>(
    pixel: &str,
    raw: Option<&Value>,
    what: &str,
    mut parse_one: impl FnMut(&Value) -> Result<T>,
) -> Result<Vec<T>> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(&mut parse_one).collect(),
        Some(_) => Err(PixelError::definition(
            pixel,
            format!("{} list must be an array", what),
        )),
    }
}

/// Normalize a common-parameter catalog: entries without `key` or
/// `keyPattern` take their catalog name as key.
pub fn normalize_param_catalog(catalog: NamedSpecs<ParamSpec>) -> NamedSpecs<ParamSpec> {
    catalog
        .into_iter()
        .map(|(name, mut spec)| {
            if spec.key.is_none() && spec.key_pattern.is_none() {
                spec.key = Some(name.clone());
            }
            (name, spec)
        })
        .collect()
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Enum values may be written as strings, numbers or booleans; they are
/// compared as strings.
fn scalar_strings<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "enum values must be scalars, got {}",
                other
            ))),
        })
        .collect()
}
