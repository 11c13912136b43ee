//! pixel-core: pixel definition compiler and live-event validator
//!
//! This crate contains the pure validation logic with NO filesystem access:
//! - Definition types (pixel families, parameter and suffix specs)
//! - Tokenizer that merges definition files into a prefix trie
//! - Schema compiler turning specs into reusable matchers
//! - Live validator with longest-prefix lookup and error-example buffers
//! - Reporting aggregation over validation outcomes
//!
//! Loading definition directories, reading CSV exports and writing result
//! files remain in the `pixel-qa` root crate.
//!
//! # Example
//!
//! ```
//! use pixel_core::{CompileContext, LivePixelValidator, Outcome, Tokenizer};
//!
//! let defs = serde_json::json!({
//!     "app.click": { "owners": ["teamA"], "parameters": [{ "key": "id", "required": true }] }
//! });
//! let mut tokenizer = Tokenizer::default();
//! tokenizer.add_source("app.json", &defs).unwrap();
//! let trie = tokenizer.compile(&CompileContext::default()).unwrap();
//!
//! let mut validator = LivePixelValidator::new(&trie);
//! let outcome = validator.validate_pixel("app.click.extra", "id=123", None);
//! assert_eq!(outcome.kind, Outcome::ValidationPassed);
//! assert_eq!(outcome.prefix, "app.click");
//! ```

pub mod definition;
pub mod error;
pub mod event;
pub mod report;
pub mod schema;
pub mod tokenizer;
pub mod validator;
pub mod version;

// Re-export commonly used types
pub use definition::{
    normalize_param_catalog, ExperimentGate, NamedSpecs, ParamSpec, PixelDefinition, SuffixSpec,
    ValueType,
};
pub use error::{PixelError, Result};
pub use event::{parse_params, ParamToken};
pub use report::{PrefixStats, ValidationReport};
pub use schema::{
    compile_params_schema, compile_suffixes_schema, CompileContext, CompiledSchema,
    ExperimentContext, ParamsMatcher, SuffixesMatcher, Violation, ViolationKind,
};
pub use tokenizer::{
    CompiledTrie, PixelDefinitionNode, PixelFamily, PrefixMatch, Tokenizer, TrieArtifact,
};
pub use validator::{
    ErrorExample, ExampleCap, LivePixelValidator, Outcome, PixelErrors, ValidationOutcome,
    DEFAULT_EXAMPLE_CAP,
};
pub use version::AppVersion;
