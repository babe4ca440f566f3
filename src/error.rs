//! Error types for the scan-and-join pipeline.
//!
//! Every fallible operation in the crate returns [`ScanError`]. Errors carry enough
//! structured context to decide whether the pipeline should retry, skip, or give up.
//!
//! ## Error Categories
//!
//! - **Camera Errors**: Frame acquisition or camera start-up failures
//! - **Format Errors**: Frame dimensions or pixel layout that the decoder cannot take
//! - **File Errors**: Problems reading replay frames or configuration files
//! - **Decoder Errors**: The matrix-code decoder rejected a frame as a whole
//! - **Network Errors**: The network collaborator refused a configure/associate call
//! - **State Errors**: Association requested from a state that does not allow it
//! - **Task Errors**: A pipeline task panicked or was aborted
//!
//! ## Recovery and Retry
//!
//! Steady-state errors are handled where they are detected. Callers that see one
//! can ask whether it is worth retrying:
//!
//! ```rust
//! use scanlink::ScanError;
//!
//! let error = ScanError::camera_unavailable("sensor busy");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ConnectionState;

/// Result type alias for scan operations.
pub type Result<T, E = ScanError> = std::result::Result<T, E>;

/// Main error type for scan operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScanError {
    #[error("Camera unavailable: {reason}")]
    Camera { reason: String },

    #[error("Frame format mismatch: expected {expected}, found {found}")]
    FrameFormat { expected: String, found: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decoder rejected frame: {details}")]
    Decoder { details: String },

    #[error("Network operation '{operation}' failed")]
    Network {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Association already in progress (state: {state})")]
    Busy { state: ConnectionState },

    #[error("Invalid connection transition: {from} -> {to}")]
    InvalidTransition { from: ConnectionState, to: ConnectionState },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Pipeline task '{task}' failed: {details}")]
    TaskFailed { task: &'static str, details: String },
}

impl ScanError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScanError::Camera { .. } => true,
            ScanError::Decoder { .. } => true,
            ScanError::Network { .. } => true,
            ScanError::Busy { .. } => true,
            ScanError::FrameFormat { .. } => false,
            ScanError::File { .. } => false,
            ScanError::InvalidTransition { .. } => false,
            ScanError::Config { .. } => false,
            ScanError::TaskFailed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ScanError::Camera { .. } => vec![
                "Check the camera module connection",
                "Verify the sensor has stable power",
                "Retry acquisition after a short backoff",
            ],
            ScanError::FrameFormat { .. } => vec![
                "Match the decoder dimensions to the camera frame size",
                "Use a grayscale or RGB565 pixel format",
            ],
            ScanError::File { .. } => vec![
                "Check the file exists and is readable",
                "Verify replay frames are PGM, PPM or PNM images",
            ],
            ScanError::Decoder { .. } => vec![
                "Improve lighting or focus on the code",
                "Hold the code steady within the frame",
            ],
            ScanError::Network { .. } => vec![
                "Check the network interface is started",
                "Verify the network name and secret",
                "Move closer to the access point",
            ],
            ScanError::Busy { .. } => vec![
                "Wait for the in-flight association to resolve",
                "Retry after the association times out",
            ],
            ScanError::InvalidTransition { .. } => vec![
                "Inspect the current link status before requesting association",
            ],
            ScanError::Config { .. } => vec![
                "Check the configuration values are non-zero",
                "Verify the YAML file matches the expected layout",
            ],
            ScanError::TaskFailed { .. } => vec![
                "Check the logs for a panic in the named task",
                "Restart the scanner",
            ],
        }
    }

    /// Helper constructor for camera acquisition failures.
    pub fn camera_unavailable(reason: impl Into<String>) -> Self {
        ScanError::Camera { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ScanError::File { path, source }
    }

    /// Helper constructor for network collaborator failures.
    pub fn network_failed(operation: impl Into<String>) -> Self {
        ScanError::Network { operation: operation.into(), source: None }
    }

    /// Helper constructor for network failures with source.
    pub fn network_failed_with_source(
        operation: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ScanError::Network { operation: operation.into(), source: Some(source) }
    }

    /// Helper constructor for frame format mismatches.
    pub fn frame_format(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ScanError::FrameFormat { expected: expected.into(), found: found.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        ScanError::Config { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for ScanError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        ScanError::Config { context: "YAML".to_string(), details: err.to_string() }
    }
}
