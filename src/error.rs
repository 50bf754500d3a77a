//! Error types for the conversion engine.

use thiserror::Error;

/// Errors raised by the fallible parts of the engine.
///
/// None of these reach the caller of `Converter::convert`; they surface from
/// the bridge backend, configuration loading and wire decoding.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bridge not found: {0}")]
    BridgeNotFound(String),

    #[error("Bridge failed: {0}")]
    BridgeFailed(String),

    #[error("Bridge timed out after {0} seconds")]
    BridgeTimeout(u64),

    #[error("Unsupported block type: {0}")]
    UnsupportedBlock(String),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("{0}")]
    Table(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
