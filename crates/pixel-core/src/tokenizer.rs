//! Definition Tokenizer
//!
//! Merges definition sources into a prefix trie keyed by dot segment, then
//! compiles it. Two representations exist:
//!
//! - [`PixelDefinitionNode`]: the serializable trie of declared definitions
//!   (shortcuts resolved). This is what gets persisted as a [`TrieArtifact`].
//! - [`CompiledTrie`]: the read-only lookup structure used by the validator.
//!   Every declared family carries a [`CompiledSchema`] with ancestor specs
//!   already merged in, so lookups never walk back up the tree.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::definition::{normalize_param_catalog, NamedSpecs, ParamSpec, PixelDefinition, SuffixSpec};
use crate::error::{PixelError, Result};
use crate::schema::{CompileContext, CompiledSchema};
use crate::version::AppVersion;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

// =============================================================================
// DECLARED TRIE
// =============================================================================

/// One trie node per path segment of a pixel name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelDefinitionNode {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, PixelDefinitionNode>,
    /// Present on terminal nodes, i.e. declared pixel families
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<PixelDefinition>,
    /// Source that declared this family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl PixelDefinitionNode {
    pub fn is_terminal(&self) -> bool {
        self.definition.is_some()
    }

    /// Origin of this node's declaration, or of the first declared
    /// descendant in key order
    pub fn first_origin(&self) -> Option<&str> {
        self.origin
            .as_deref()
            .or_else(|| self.children.values().find_map(PixelDefinitionNode::first_origin))
    }

    /// Exact lookup by dot-delimited path
    pub fn get(&self, path: &str) -> Option<&PixelDefinitionNode> {
        path.split('.')
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    pub fn terminal_count(&self) -> usize {
        usize::from(self.is_terminal())
            + self
                .children
                .values()
                .map(PixelDefinitionNode::terminal_count)
                .sum::<usize>()
    }
}

/// Persisted form of the declared trie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrieArtifact {
    pub format_version: u32,
    pub trie: PixelDefinitionNode,
}

impl TrieArtifact {
    pub fn new(trie: PixelDefinitionNode) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trie,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PixelError::Artifact(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let artifact: Self =
            serde_json::from_str(raw).map_err(|e| PixelError::Artifact(e.to_string()))?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PixelError::Artifact(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }

    pub fn compile(&self, ctx: &CompileContext) -> Result<CompiledTrie> {
        CompiledTrie::build(&self.trie, ctx)
    }
}

// =============================================================================
// TOKENIZER
// =============================================================================

/// Builds the declared trie from definition sources, in caller order.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    root: PixelDefinitionNode,
    common_params: NamedSpecs<ParamSpec>,
    common_suffixes: NamedSpecs<SuffixSpec>,
}

impl Tokenizer {
    /// Tokenizer resolving shortcuts against the given common catalogs
    pub fn new(common_params: NamedSpecs<ParamSpec>, common_suffixes: NamedSpecs<SuffixSpec>) -> Self {
        Self {
            root: PixelDefinitionNode::default(),
            common_params: normalize_param_catalog(common_params),
            common_suffixes,
        }
    }

    /// Add one definition source: a mapping from pixel family name to
    /// definition object. Returns the number of families added.
    ///
    /// Redeclaring a family identically is a no-op; redeclaring it
    /// differently is a [`PixelError::ConfigurationConflict`].
    pub fn add_source(&mut self, origin: &str, records: &Value) -> Result<usize> {
        let map = records.as_object().ok_or_else(|| {
            PixelError::definition(origin, "definition source must be a mapping of pixel names")
        })?;

        let mut added = 0;
        for (name, value) in map {
            check_name(name)?;
            let definition =
                PixelDefinition::from_value(name, value, &self.common_params, &self.common_suffixes)?;
            if self.insert(origin, name, definition)? {
                added += 1;
            }
        }

        debug!("Tokenized {} pixel families from {}", added, origin);
        Ok(added)
    }

    fn insert(&mut self, origin: &str, name: &str, definition: PixelDefinition) -> Result<bool> {
        let node = name.split('.').fold(&mut self.root, |node, segment| {
            node.children.entry(segment.to_string()).or_default()
        });

        if let Some(existing) = &node.definition {
            if *existing != definition {
                return Err(PixelError::ConfigurationConflict {
                    pixel: name.to_string(),
                    first: node.origin.clone().unwrap_or_default(),
                    second: origin.to_string(),
                });
            }
            debug!("Identical redeclaration of {} in {}", name, origin);
            return Ok(false);
        }

        node.definition = Some(definition);
        node.origin = Some(origin.to_string());
        Ok(true)
    }

    pub fn root(&self) -> &PixelDefinitionNode {
        &self.root
    }

    pub fn into_artifact(self) -> TrieArtifact {
        TrieArtifact::new(self.root)
    }

    pub fn compile(&self, ctx: &CompileContext) -> Result<CompiledTrie> {
        CompiledTrie::build(&self.root, ctx)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(PixelError::definition(name, "pixel name has an empty segment"));
    }
    Ok(())
}

// =============================================================================
// COMPILED TRIE
// =============================================================================

/// A declared family with its schema compiled.
#[derive(Debug)]
pub struct PixelFamily {
    pub prefix: String,
    pub owners: BTreeSet<String>,
    /// Highest of product, inherited pixel and parameter versions
    pub min_version: Option<AppVersion>,
    pub schema: CompiledSchema,
}

#[derive(Debug, Default)]
pub struct CompiledNode {
    children: HashMap<String, CompiledNode>,
    family: Option<Arc<PixelFamily>>,
}

/// Result of a longest-prefix walk
#[derive(Debug, Clone, Copy)]
pub struct PrefixMatch<'t, 'p> {
    /// Family at the deepest node reached, if that node is declared
    pub family: Option<&'t PixelFamily>,
    /// Unmatched trailing path, without its leading dot
    pub remainder: &'p str,
}

#[derive(Debug, Default)]
pub struct CompiledTrie {
    root: CompiledNode,
    families: usize,
    lower_case: bool,
}

/// Specs accumulated from ancestors during the compile walk
#[derive(Clone, Default)]
struct Inherited {
    /// Nearest ancestor first
    params: Vec<ParamSpec>,
    /// Root-most ancestor first
    suffixes: Vec<SuffixSpec>,
    min_version: Option<AppVersion>,
}

impl CompiledTrie {
    pub fn build(root: &PixelDefinitionNode, ctx: &CompileContext) -> Result<Self> {
        let mut trie = Self {
            root: CompiledNode::default(),
            families: 0,
            lower_case: ctx.force_lower_case,
        };
        let inherited = Inherited {
            min_version: ctx.min_version.clone(),
            ..Default::default()
        };
        trie.root = trie.compile_node(root, "", &inherited, ctx)?;
        info!("Compiled {} pixel families", trie.families);
        Ok(trie)
    }

    fn compile_node(
        &mut self,
        node: &PixelDefinitionNode,
        path: &str,
        inherited: &Inherited,
        ctx: &CompileContext,
    ) -> Result<CompiledNode> {
        let mut compiled = CompiledNode::default();
        let mut scope = inherited.clone();

        if let Some(def) = &node.definition {
            let mut params = def.parameters.clone();
            params.extend(inherited.params.iter().cloned());
            let mut suffixes = inherited.suffixes.clone();
            suffixes.extend(def.suffixes.iter().cloned());
            let min_version = max_version(inherited.min_version.as_ref(), def.min_version.as_ref());

            let schema = CompiledSchema::compile(path, &params, &suffixes, ctx)?;
            let family_floor = max_version(min_version.as_ref(), schema.params.version_floor());

            compiled.family = Some(Arc::new(PixelFamily {
                prefix: path.to_string(),
                owners: def.owners.clone(),
                min_version: family_floor,
                schema,
            }));
            self.families += 1;

            scope = Inherited {
                params,
                suffixes,
                min_version,
            };
        }

        for (segment, child) in &node.children {
            let key = if self.lower_case {
                segment.to_lowercase()
            } else {
                segment.clone()
            };
            let child_path = if path.is_empty() {
                segment.clone()
            } else {
                format!("{}.{}", path, segment)
            };
            let compiled_child = self.compile_node(child, &child_path, &scope, ctx)?;
            if compiled.children.insert(key, compiled_child).is_some() {
                let folded = segment.to_lowercase();
                let earlier = node
                    .children
                    .iter()
                    .find(|(other, _)| *other != segment && other.to_lowercase() == folded)
                    .and_then(|(_, sibling)| sibling.first_origin());
                return Err(PixelError::ConfigurationConflict {
                    pixel: child_path,
                    first: earlier.unwrap_or_default().to_string(),
                    second: child.first_origin().unwrap_or_default().to_string(),
                });
            }
        }

        Ok(compiled)
    }

    /// Walk segment by segment while a child exists.
    pub fn longest_prefix<'t, 'p>(&'t self, pixel: &'p str) -> PrefixMatch<'t, 'p> {
        let mut node = &self.root;
        let mut consumed = 0usize;

        for segment in pixel.split('.') {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    consumed += segment.len() + 1;
                }
                None => break,
            }
        }

        let remainder = pixel.get(consumed..).unwrap_or("");
        PrefixMatch {
            family: node.family.as_deref(),
            remainder,
        }
    }

    pub fn family_count(&self) -> usize {
        self.families
    }

    pub fn lower_case(&self) -> bool {
        self.lower_case
    }
}

fn max_version(a: Option<&AppVersion>, b: Option<&AppVersion>) -> Option<AppVersion> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a >= b { a.clone() } else { b.clone() }),
        (Some(v), None) | (None, Some(v)) => Some(v.clone()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokenizer(defs: Value) -> Tokenizer {
        let mut t = Tokenizer::default();
        t.add_source("defs.json", &defs).unwrap();
        t
    }

    #[test]
    fn test_segments_become_edges() {
        let t = tokenizer(json!({
            "app.click": { "owners": ["teamA"] },
            "app.click.menu": { "owners": ["teamB"] }
        }));
        let root = t.root();
        assert!(!root.get("app").unwrap().is_terminal());
        assert!(root.get("app.click").unwrap().is_terminal());
        assert!(root.get("app.click.menu").unwrap().is_terminal());
        assert_eq!(root.terminal_count(), 2);
        assert_eq!(
            root.get("app.click").unwrap().origin.as_deref(),
            Some("defs.json")
        );
    }

    #[test]
    fn test_conflicting_redeclaration() {
        let mut t = tokenizer(json!({ "app.click": { "owners": ["teamA"] } }));
        // Identical is fine
        assert_eq!(
            t.add_source("again.json", &json!({ "app.click": { "owners": ["teamA"] } }))
                .unwrap(),
            0
        );
        // Different is not
        let err = t
            .add_source("other.json", &json!({ "app.click": { "owners": ["teamB"] } }))
            .unwrap_err();
        assert_eq!(
            err,
            PixelError::ConfigurationConflict {
                pixel: "app.click".into(),
                first: "defs.json".into(),
                second: "other.json".into(),
            }
        );
    }

    #[test]
    fn test_later_sources_augment() {
        let mut t = tokenizer(json!({ "app.click": { "owners": ["teamA"] } }));
        t.add_source("more.json", &json!({ "app.view": { "owners": ["teamA"] } }))
            .unwrap();
        assert_eq!(t.root().terminal_count(), 2);
    }

    #[test]
    fn test_bad_names_and_sources() {
        let mut t = Tokenizer::default();
        assert!(t.add_source("x", &json!({ "a..b": { "owners": [] } })).is_err());
        assert!(t.add_source("x", &json!(["not", "a", "map"])).is_err());
    }

    #[test]
    fn test_longest_prefix_prefers_deeper_family() {
        let t = tokenizer(json!({
            "a": { "owners": ["x"] },
            "a.b": { "owners": ["y"] }
        }));
        let trie = t.compile(&CompileContext::default()).unwrap();

        let m = trie.longest_prefix("a.b.c");
        assert_eq!(m.family.unwrap().prefix, "a.b");
        assert_eq!(m.remainder, "c");

        let m = trie.longest_prefix("a.b");
        assert_eq!(m.family.unwrap().prefix, "a.b");
        assert_eq!(m.remainder, "");

        let m = trie.longest_prefix("zzz.b");
        assert!(m.family.is_none());
        assert_eq!(m.remainder, "zzz.b");
    }

    #[test]
    fn test_children_inherit_ancestor_specs() {
        let t = tokenizer(json!({
            "app": {
                "owners": ["x"],
                "minVersion": "2.0.0",
                "parameters": [{ "key": "shared", "required": true }]
            },
            "app.click": {
                "owners": ["x"],
                "parameters": [{ "key": "own" }]
            }
        }));
        let trie = t.compile(&CompileContext::default()).unwrap();
        let family = trie.longest_prefix("app.click").family.unwrap();
        assert_eq!(family.schema.params.len(), 2);
        assert_eq!(family.min_version, Some(AppVersion::parse("2.0.0").unwrap()));
        let violations = family.schema.params.check(&[]);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_artifact_round_trip() {
        let t = tokenizer(json!({
            "app.click": { "owners": ["teamA"], "parameters": [{ "key": "id", "required": true }] }
        }));
        let artifact = t.into_artifact();
        let json = artifact.to_json().unwrap();
        let back = TrieArtifact::from_json(&json).unwrap();
        assert_eq!(back, artifact);
        assert_eq!(back.to_json().unwrap(), json);
    }

    #[test]
    fn test_artifact_rejects_unknown_format() {
        let err = TrieArtifact::from_json(r#"{"formatVersion": 99, "trie": {}}"#).unwrap_err();
        assert!(matches!(err, PixelError::Artifact(_)));
        assert!(TrieArtifact::from_json("not json").is_err());
    }

    #[test]
    fn test_lower_case_collision_names_both_files() {
        let mut t = tokenizer(json!({ "App.click": { "owners": ["x"] } }));
        t.add_source("lower.json", &json!({ "app.click": { "owners": ["y"] } }))
            .unwrap();
        let ctx = CompileContext {
            force_lower_case: true,
            ..Default::default()
        };
        // "App" sorts before "app", so "App" is compiled first
        assert_eq!(
            t.compile(&ctx).unwrap_err(),
            PixelError::ConfigurationConflict {
                pixel: "app".into(),
                first: "defs.json".into(),
                second: "lower.json".into(),
            }
        );
    }

    #[test]
    fn test_misspelled_fields_fail_tokenize() {
        let mut t = Tokenizer::default();
        let err = t
            .add_source(
                "defs.json",
                &json!({
                    "app.click": {
                        "owners": ["a"],
                        "parameters": [{ "key": "id", "requird": true }],
                        "sufixes": [{ "key": "phone" }]
                    }
                }),
            )
            .unwrap_err();
        assert!(matches!(err, PixelError::DefinitionFormat { ref pixel, .. } if pixel == "app.click"));
        assert_eq!(t.root().terminal_count(), 0);
    }
}
