//! Error types for the session runtime and its collaborators.
//!
//! None of these ever reach the editor's event path: generation errors
//! become a `failed` task and save errors an `unsaved` status.

use std::path::PathBuf;

/// The image generation backend could not produce an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation backend rejected the request: {0}")]
    Backend(String),

    #[error("generation timed out after {0} ms")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    NotFound(String),

    #[error("project already exists: {0}")]
    AlreadyExists(String),

    #[error("card not found: {0}")]
    CardNotFound(u64),

    #[error("invalid card type {0:?}; expected hook, inspiration, template, product, or constraint")]
    InvalidCardType(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),

    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("empty upload")]
    Empty,

    #[error("invalid base64 data: {0}")]
    InvalidBase64(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not authorized to open project {0}")]
    Unauthorized(String),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}
