use thiserror::Error;

pub type Result<T> = std::result::Result<T, PixelError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PixelError {
    /// A catalog entry could not be understood. Fatal to the compile step.
    #[error("invalid definition for pixel '{pixel}': {reason}")]
    DefinitionFormat { pixel: String, reason: String },

    /// Two definition sources declare the same pixel family differently.
    #[error("pixel '{pixel}' declared in both '{first}' and '{second}' with different definitions")]
    ConfigurationConflict {
        pixel: String,
        first: String,
        second: String,
    },

    /// A single event could not be tokenized. Recorded, never fatal.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// The persisted trie could not be read back.
    #[error("unreadable trie artifact: {0}")]
    Artifact(String),
}

impl PixelError {
    pub fn definition(pixel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DefinitionFormat {
            pixel: pixel.into(),
            reason: reason.into(),
        }
    }
}
