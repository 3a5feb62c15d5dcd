//! Configuration loading and discovery for `pxsmooth.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{LogLevel, SmoothConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up by [`find_config`]
pub const CONFIG_FILE: &str = "pxsmooth.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse pxsmooth.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub out_dir: Option<PathBuf>,
    /// Override output file suffix
    pub suffix: Option<String>,
    /// Enable the distance field dump
    pub dump_distance: Option<bool>,
    /// Enable the offset map dump
    pub dump_offsets: Option<bool>,
    /// Enable the traced segment dump
    pub dump_contours: Option<bool>,
    /// Minimum log level
    pub log_level: Option<LogLevel>,
}

/// Find pxsmooth.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for pxsmooth.toml
/// 2. Check XDG_CONFIG_HOME/pixelsmooth/pxsmooth.toml (or ~/.config/pixelsmooth/pxsmooth.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find pxsmooth.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("pixelsmooth").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find pxsmooth.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a pxsmooth.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("sprites/pxsmooth.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<SmoothConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            log::debug!("loading config from {}", p.display());
            load_config_file(&p)
        }
        None => Ok(SmoothConfig::default()),
    }
}

fn load_config_file(path: &Path) -> Result<SmoothConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SmoothConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. The merged
/// configuration is validated again, since an override can break a rule the
/// file satisfied (an empty `--suffix` without an output directory).
pub fn merge_cli_overrides(
    config: &mut SmoothConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(ref out_dir) = overrides.out_dir {
        config.output.out_dir = Some(out_dir.clone());
    }

    if let Some(ref suffix) = overrides.suffix {
        config.output.suffix = suffix.clone();
    }

    if let Some(dump) = overrides.dump_distance {
        config.debug.dump_distance = dump;
    }
    if let Some(dump) = overrides.dump_offsets {
        config.debug.dump_offsets = dump;
    }
    if let Some(dump) = overrides.dump_contours {
        config.debug.dump_contours = dump;
    }

    if let Some(level) = overrides.log_level {
        config.logging.level = level;
    }

    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}
