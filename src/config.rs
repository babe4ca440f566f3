//! Scanner configuration
//!
//! All fields have defaults matching the reference camera setup, so an empty YAML
//! document (or [`ScannerConfig::default()`]) is a valid configuration.
//!
//! ```
//! use scanlink::ScannerConfig;
//!
//! let config = ScannerConfig::from_yaml_str("capture_period_ms: 40\ntruncation: reject\n").unwrap();
//! assert_eq!(config.capture_period().as_millis(), 40);
//! assert_eq!(config.frame.width, 320);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::connection::AssociationWait;
use crate::credential::TruncationPolicy;
use crate::{Result, ScanError};

/// Bound on waiting for an address after each attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 100, max_polls: 100 }
    }
}

/// Frame geometry the decoder is sized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { width: 320, height: 240 }
    }
}

/// Top-level configuration for [`Scanner::spawn`](crate::Scanner::spawn)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Capture cadence. Default: 20ms
    pub capture_period_ms: u64,

    /// Pause after a failed acquisition. Default: 100ms
    pub acquire_backoff_ms: u64,

    /// Bound on each wait for a frame; unbounded when absent
    pub decode_receive_timeout_ms: Option<u64>,

    pub association: AssociationConfig,

    /// Handling of over-long credential fields. Default: silent truncation
    pub truncation: TruncationPolicy,

    pub frame: FrameConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            capture_period_ms: 20,
            acquire_backoff_ms: 100,
            decode_receive_timeout_ms: None,
            association: AssociationConfig::default(),
            truncation: TruncationPolicy::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl ScannerConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ScannerConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml =
            std::fs::read_to_string(path).map_err(|e| ScanError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capture_period_ms == 0 {
            return Err(ScanError::config("capture_period_ms", "capture period must be non-zero"));
        }
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(ScanError::config(
                "frame",
                format!("dimensions must be non-zero, got {}x{}", self.frame.width, self.frame.height),
            ));
        }
        if self.association.max_polls == 0 {
            return Err(ScanError::config("association.max_polls", "at least one poll is required"));
        }
        if self.association.poll_interval_ms == 0 {
            return Err(ScanError::config("association.poll_interval_ms", "poll interval must be non-zero"));
        }
        Ok(())
    }

    pub fn capture_period(&self) -> Duration {
        Duration::from_millis(self.capture_period_ms)
    }

    pub fn acquire_backoff(&self) -> Duration {
        Duration::from_millis(self.acquire_backoff_ms)
    }

    pub fn decode_receive_timeout(&self) -> Option<Duration> {
        self.decode_receive_timeout_ms.map(Duration::from_millis)
    }

    pub fn association_wait(&self) -> AssociationWait {
        AssociationWait::new(
            Duration::from_millis(self.association.poll_interval_ms),
            self.association.max_polls,
        )
    }
}
