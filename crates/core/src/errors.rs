//! Error types for the idproxy core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Subject normalization has no error type: every identifier, including an
//! absent one, maps to a defined outcome.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    AttributeMap(#[from] AttributeMapError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is missing or invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// The attribute map referenced by the config could not be loaded.
    #[error("configuration attribute map error: {0}")]
    AttributeMap(#[from] AttributeMapError),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Attribute map errors
// ---------------------------------------------------------------------------

/// Errors from the attribute map subsystem.
#[derive(Debug, Error)]
pub enum AttributeMapError {
    /// The map file could not be loaded.
    #[error("attribute map file error at '{path}': {detail}")]
    MapFileError {
        path: String,
        detail: String,
    },

    /// TOML parse or serialize error.
    #[error("attribute map parse error: {0}")]
    ParseError(String),

    /// The `fro` and `to` tables disagree about a name.
    #[error("attribute map is inconsistent for '{name}': {detail}")]
    Inconsistent {
        name: String,
        detail: String,
    },

    /// Generic I/O error.
    #[error("attribute map I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Errors raised while running response stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage reported a failure; the remaining stages were not run.
    #[error("response stage '{stage}' failed: {detail}")]
    StageFailed {
        stage: String,
        detail: String,
    },
}
