use thiserror::Error;

/// Top-level error type for the Huddle system.
///
/// Storage and configuration failures surface through this type. Higher-level
/// crates define their own error types and implement `From<HuddleError>` so
/// that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HuddleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HuddleError {
    fn from(err: toml::de::Error) -> Self {
        HuddleError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HuddleError {
    fn from(err: toml::ser::Error) -> Self {
        HuddleError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HuddleError {
    fn from(err: serde_json::Error) -> Self {
        HuddleError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Huddle operations.
pub type Result<T> = std::result::Result<T, HuddleError>;
