//! Definitions loader
//!
//! Reads a definitions root laid out as:
//!
//! ```text
//! <root>/
//!   product.json            optional, see ProductConfig
//!   common_params.json      optional, name -> ParamSpec
//!   common_suffixes.json    optional, name -> SuffixSpec
//!   ignore_params.json      optional, list of names or name -> ParamSpec
//!   definitions/**.json     pixel definitions (.json, .yaml, .yml)
//! ```
//!
//! Any of the JSON files may be YAML instead. Definition files whose name
//! starts with `TEMPLATE` are skipped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use pixel_core::{CompileContext, NamedSpecs, ParamSpec, SuffixSpec, Tokenizer};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::types::ProductConfig;

const DEFINITIONS_DIR: &str = "definitions";
const TEMPLATE_PREFIX: &str = "TEMPLATE";
const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

pub struct DefinitionsLoader {
    root: PathBuf,
}

/// Everything needed to compile a trie, loaded from one definitions root.
pub struct LoadedDefinitions {
    pub product: ProductConfig,
    pub context: CompileContext,
    pub tokenizer: Tokenizer,
    pub files: Vec<PathBuf>,
}

impl DefinitionsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load product config, catalogs and every definition file, in sorted
    /// path order. `global_ignore` is combined with the product ignore list.
    pub fn load(&self, global_ignore: Option<&Path>) -> Result<LoadedDefinitions> {
        if !self.root.is_dir() {
            return Err(anyhow!(
                "Definitions root {} is not a directory",
                self.root.display()
            ));
        }

        let product = self.load_product()?;
        let context = self.compile_context(&product, global_ignore)?;

        let mut tokenizer = Tokenizer::new(context.common_params.clone(), context.common_suffixes.clone());
        let files = self.definition_files()?;
        for path in &files {
            let records = read_value(path)?;
            let origin = self.origin(path);
            tokenizer
                .add_source(&origin, &records)
                .with_context(|| format!("Failed to tokenize {}", path.display()))?;
        }

        info!(
            "Loaded {} pixel families from {} definition files",
            tokenizer.root().terminal_count(),
            files.len()
        );

        Ok(LoadedDefinitions {
            product,
            context,
            tokenizer,
            files,
        })
    }

    /// Product config and catalogs only, for validating against a persisted
    /// trie
    pub fn load_context(&self, global_ignore: Option<&Path>) -> Result<(ProductConfig, CompileContext)> {
        let product = self.load_product()?;
        let context = self.compile_context(&product, global_ignore)?;
        Ok((product, context))
    }

    pub fn load_product(&self) -> Result<ProductConfig> {
        match self.find_config("product") {
            Some(path) => {
                info!("Loading product configuration from {}", path.display());
                read_typed(&path)
            }
            None => {
                debug!("No product configuration in {}", self.root.display());
                Ok(ProductConfig::default())
            }
        }
    }

    fn compile_context(&self, product: &ProductConfig, global_ignore: Option<&Path>) -> Result<CompileContext> {
        let common_params: NamedSpecs<ParamSpec> = self.load_catalog("common_params")?;
        let common_suffixes: NamedSpecs<SuffixSpec> = self.load_catalog("common_suffixes")?;

        let mut ignore_params = BTreeSet::new();
        if let Some(path) = self.find_config("ignore_params") {
            ignore_params.extend(read_ignore_list(&path)?);
        }
        if let Some(path) = global_ignore {
            ignore_params.extend(read_ignore_list(path)?);
        }

        info!(
            "Compile context: {} common params, {} common suffixes, {} ignored params, {} experiments",
            common_params.len(),
            common_suffixes.len(),
            ignore_params.len(),
            product.experiments().len()
        );

        Ok(CompileContext {
            common_params: pixel_core::normalize_param_catalog(common_params),
            common_suffixes,
            ignore_params,
            force_lower_case: product.force_lower_case,
            experiments: product.experiments(),
            min_version: product.min_version().cloned(),
        })
    }

    fn load_catalog<T: DeserializeOwned>(&self, stem: &str) -> Result<NamedSpecs<T>> {
        match self.find_config(stem) {
            Some(path) => read_typed(&path),
            None => Ok(NamedSpecs::new()),
        }
    }

    fn find_config(&self, stem: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", stem, ext)))
            .find(|p| p.is_file())
    }

    /// Definition files under `<root>/definitions`, sorted for deterministic
    /// merge order
    pub fn definition_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(DEFINITIONS_DIR);
        if !dir.is_dir() {
            return Err(anyhow!("Missing definitions directory {}", dir.display()));
        }
        let mut files = find_definition_files(&dir)?;
        files.sort();
        Ok(files)
    }

    fn origin(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

fn find_definition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            files.extend(find_definition_files(&path)?);
            continue;
        }

        let is_definition = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e))
            .unwrap_or(false);
        let is_template = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(TEMPLATE_PREFIX))
            .unwrap_or(false);

        if is_template {
            debug!("Skipping template {}", path.display());
        } else if is_definition {
            files.push(path);
        }
    }

    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

/// Read a JSON or YAML file into a JSON value
pub fn read_value(path: &Path) -> Result<Value> {
    read_typed(path)
}

fn read_typed<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if is_yaml(path) {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// An ignore list is either a list of names or a mapping keyed by name
fn read_ignore_list(path: &Path) -> Result<Vec<String>> {
    match read_value(path)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(anyhow!(
                    "{}: ignore entries must be strings, got {}",
                    path.display(),
                    other
                )),
            })
            .collect(),
        Value::Object(map) => Ok(map.into_iter().map(|(k, _)| k).collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(anyhow!(
            "{}: ignore list must be a list or mapping",
            path.display()
        )),
    }
}
