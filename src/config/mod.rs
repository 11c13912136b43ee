//! Definition directory and product configuration

pub mod loader;
pub mod types;

pub use loader::{DefinitionsLoader, LoadedDefinitions};
pub use types::{ExperimentConfig, ProductConfig, TargetConfig};
