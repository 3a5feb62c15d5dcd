//! Configuration schema types for `pxsmooth.toml`
//!
//! Defines the structure and validation rules for upscaler configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log verbosity accepted in `[logging] level`, ordered from quietest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter string understood by `env_logger`
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Where upscaled images are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Appended to the input file stem
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Directory for outputs; next to the input when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { suffix: default_suffix(), out_dir: None }
    }
}

fn default_suffix() -> String {
    "_2x".to_string()
}

/// Intermediate images written alongside each output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Grayscale view of the distance field
    #[serde(default)]
    pub dump_distance: bool,
    /// Grayscale view of the offset map at output resolution
    #[serde(default)]
    pub dump_offsets: bool,
    /// Traced segments at output resolution, one color per segment
    #[serde(default)]
    pub dump_contours: bool,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Complete pxsmooth.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmoothConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "output.suffix")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pxsmooth.toml: '{}' {}", self.field, self.message)
    }
}

impl SmoothConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        // An empty suffix next to the input would overwrite it
        if self.output.suffix.is_empty() && self.output.out_dir.is_none() {
            errors.push(ConfigValidationError {
                field: "output.suffix".to_string(),
                message: "must be non-empty unless output.out_dir is set".to_string(),
            });
        }

        if self.output.suffix.contains(std::path::is_separator) {
            errors.push(ConfigValidationError {
                field: "output.suffix".to_string(),
                message: "must not contain path separators".to_string(),
            });
        }

        errors
    }
}
