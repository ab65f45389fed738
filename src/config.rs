//! Configuration for town-ledger
//!
//! Loaded from an optional TOML file; command-line flags override it.

use crate::parser::{DEFAULT_EXTENSION, DEFAULT_HEADER_MARKER};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// SECTIONS
// ============================================================================

/// Where listings come from and how they are recognised
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root directory (one subdirectory per governorate)
    pub input_dir: PathBuf,
    /// City file extension, without the dot
    pub extension: String,
    /// Prefix of subdistrict header lines
    pub header_marker: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./سوريا"),
            extension: DEFAULT_EXTENSION.to_string(),
            header_marker: DEFAULT_HEADER_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub output: PathBuf,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("syrian_towns.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("towns.db"),
        }
    }
}

/// Report label translation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Source language, "auto" to detect
    pub source: String,
    pub target: String,
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            source: "auto".to_string(),
            target: "en".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Log severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub csv: CsvConfig,
    pub database: DatabaseConfig,
    pub translation: TranslationConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// `load` when the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.extension.is_empty() || self.source.extension.starts_with('.') {
            bail!(
                "source.extension must be a bare extension like \"txt\", got {:?}",
                self.source.extension
            );
        }
        if self.source.header_marker.trim().is_empty() {
            bail!("source.header_marker must not be empty");
        }
        if self.translation.enabled && self.translation.target.is_empty() {
            bail!("translation.target must be set when translation is enabled");
        }
        Ok(())
    }
}
