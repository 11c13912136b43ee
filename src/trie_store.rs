//! Compiled-trie persistence
//!
//! The tokenize step writes a single JSON artifact; the validate step reads
//! it back in a separate invocation and recompiles the matchers.

use std::path::Path;

use anyhow::{Context, Result};
use pixel_core::TrieArtifact;
use tracing::info;

pub fn save_trie(path: &Path, artifact: &TrieArtifact) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = artifact.to_json()?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "Wrote {} pixel families to {}",
        artifact.trie.terminal_count(),
        path.display()
    );
    Ok(())
}

pub fn load_trie(path: &Path) -> Result<TrieArtifact> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trie artifact {}", path.display()))?;
    let artifact = TrieArtifact::from_json(&content)
        .with_context(|| format!("Failed to load trie artifact {}", path.display()))?;

    info!(
        "Loaded {} pixel families from {}",
        artifact.trie.terminal_count(),
        path.display()
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_core::Tokenizer;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/trie.json");

        let mut tokenizer = Tokenizer::default();
        tokenizer
            .add_source(
                "defs.json",
                &serde_json::json!({ "app.click": { "owners": ["teamA"] } }),
            )
            .unwrap();
        let artifact = tokenizer.into_artifact();

        save_trie(&path, &artifact).unwrap();
        assert_eq!(load_trie(&path).unwrap(), artifact);
    }

    #[test]
    fn test_unreadable_artifact_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trie.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_trie(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("trie.json"));
    }
}
