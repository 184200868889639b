//! Error types for Spark

use thiserror::Error;

/// The main error type for Spark operations
#[derive(Debug, Error)]
pub enum SparkError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Value out of range: {field} must be at least {min}, got {value}")]
    ValueOutOfRange { field: String, min: f64, value: f64 },

    #[error("Missing required binding: {0}")]
    MissingBinding(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Index out of range: {what} index {index} is not below {len}")]
    IndexOutOfRange {
        what: String,
        index: usize,
        len: usize,
    },

    #[error("Unknown interpolation: {0}")]
    UnknownInterpolation(String),

    #[error("Emitter not found: {0}")]
    EmitterNotFound(String),

    #[error("Definition error: {0}")]
    DefinitionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl SparkError {
    /// Shorthand for an out-of-range index on a named collection
    pub fn index(what: &str, index: usize, len: usize) -> Self {
        SparkError::IndexOutOfRange {
            what: what.to_string(),
            index,
            len,
        }
    }
}

/// Result type alias for Spark operations
pub type Result<T> = std::result::Result<T, SparkError>;

impl From<toml::de::Error> for SparkError {
    fn from(err: toml::de::Error) -> Self {
        SparkError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for SparkError {
    fn from(err: toml::ser::Error) -> Self {
        SparkError::TomlSerError(err.to_string())
    }
}
