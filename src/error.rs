//! Error types for the chunk renderer.
//!
//! Only setup-time failures are surfaced as [`Error`]. Stale snapshots and
//! cancelled builds are absorbed where they happen, and failed builds are
//! logged by the scheduler without reaching the caller.

use thiserror::Error;

use crate::engine_state::rendering::vertex::VertexFormatKind;

/// Main error type for the chunk renderer
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported GPU feature: {0}")]
    UnsupportedFeature(String),

    #[error("Quad encoder for vertex format {0:?} is already registered")]
    EncoderAlreadyRegistered(VertexFormatKind),

    #[error("No quad encoder registered for vertex format {0:?}")]
    EncoderMissing(VertexFormatKind),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
