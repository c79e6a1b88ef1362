// ================================
// src/error.rs - frame and parameter errors
// ================================
use thiserror::Error;

/// Reasons an incoming image message cannot be turned into a color frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Unsupported image encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("Image has zero dimension ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("Row step {step} is smaller than one row of pixels ({row_bytes} bytes)")]
    StepTooSmall { step: u32, row_bytes: usize },
    #[error("Image data is truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read parameter file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse parameter file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid parameter {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
