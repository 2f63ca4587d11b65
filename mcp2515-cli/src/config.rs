//! Configuration loading and parsing

use anyhow::{Context, Result};
use mcp2515_decoder::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub filtering: FilteringConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Capture files (.csv, .json)
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Output file (default: stdout)
    pub path: Option<PathBuf>,
    /// Print detail lines under each event in text reports
    #[serde(default = "default_true")]
    pub show_details: bool,
    /// Print per-field segments under each event in text reports
    #[serde(default)]
    pub show_segments: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: None,
            show_details: true,
            show_segments: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilteringConfig {
    /// Only report events that carry warnings
    #[serde(default)]
    pub only_warnings: bool,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for file in &config.input.files {
        if !file.exists() {
            log::warn!("Configured capture file does not exist: {:?}", file);
        }
    }

    Ok(config)
}
