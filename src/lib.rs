//! Pixel QA - definition compiler and live-match validator
//!
//! File-system and I/O layer around `pixel_core`:
//! DefinitionsLoader -> Tokenizer -> TrieArtifact (persisted) -> CompiledTrie
//! -> LivePixelValidator over a streamed CSV export -> result files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixel_qa::config::DefinitionsLoader;
//! use pixel_qa::trie_store::save_trie;
//!
//! let loaded = DefinitionsLoader::new("pixel_definitions").load(None).unwrap();
//! save_trie("out/trie.json".as_ref(), &loaded.tokenizer.into_artifact()).unwrap();
//! ```

// Product config and definitions loading
pub mod config;

// Streamed validation of exported events
pub mod live_run;

// Result file writers
pub mod results;

// Persisted trie artifact
pub mod trie_store;

pub use config::{DefinitionsLoader, LoadedDefinitions, ProductConfig};
pub use live_run::{run_live_validation, LiveColumns, LiveRunStats};
pub use results::{write_results, ResultPaths, Summary};
pub use trie_store::{load_trie, save_trie};
