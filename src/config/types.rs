//! Product configuration types
//!
//! Lives next to the definitions as `product.json` (or `.yaml`):
//!
//! ```json
//! {
//!   "target": { "key": "appVersion", "version": "7.100.0" },
//!   "forceLowerCase": false,
//!   "searchExperiments": { "srp_layout": { "variants": ["b"] } },
//!   "nativeExperiments": { "onboarding_v2": { "variants": ["treatment"] } }
//! }
//! ```

use std::collections::BTreeMap;

use pixel_core::{AppVersion, ExperimentContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    #[serde(default)]
    pub target: Option<TargetConfig>,
    /// Lower-case pixel names, parameter names and values before matching
    #[serde(default)]
    pub force_lower_case: bool,
    #[serde(default)]
    pub search_experiments: BTreeMap<String, ExperimentConfig>,
    #[serde(default)]
    pub native_experiments: BTreeMap<String, ExperimentConfig>,
}

/// Which parameter carries the app version, and the oldest version
/// expected to conform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub key: String,
    #[serde(default)]
    pub version: Option<AppVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Variants enabled for this run
    #[serde(default)]
    pub variants: Vec<String>,
}

impl ProductConfig {
    /// Search and native experiments merged into one context
    pub fn experiments(&self) -> ExperimentContext {
        let mut ctx = ExperimentContext::new();
        for (id, experiment) in self
            .search_experiments
            .iter()
            .chain(self.native_experiments.iter())
        {
            for variant in &experiment.variants {
                ctx.enable(id.clone(), variant.clone());
            }
        }
        ctx
    }

    pub fn version_key(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.key.as_str())
    }

    pub fn min_version(&self) -> Option<&AppVersion> {
        self.target.as_ref().and_then(|t| t.version.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_core::ExperimentGate;

    #[test]
    fn test_parse_product_json() {
        let product: ProductConfig = serde_json::from_str(
            r#"{
                "target": { "key": "appVersion", "version": "7.100.0" },
                "forceLowerCase": true,
                "searchExperiments": { "srp": { "variants": ["b"] } },
                "nativeExperiments": { "onboarding": { "variants": ["treatment"] } }
            }"#,
        )
        .unwrap();

        assert!(product.force_lower_case);
        assert_eq!(product.version_key(), Some("appVersion"));
        assert_eq!(
            product.min_version(),
            Some(&AppVersion::parse("7.100.0").unwrap())
        );

        let experiments = product.experiments();
        assert_eq!(experiments.len(), 2);
        assert!(experiments.is_active(&ExperimentGate {
            id: "srp".into(),
            variants: vec!["a".into(), "b".into()],
        }));
    }

    #[test]
    fn test_empty_product_is_default() {
        let product: ProductConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(product, ProductConfig::default());
        assert!(product.experiments().is_empty());
    }
}
