//! CLI commands.

pub mod demo;
pub mod render;
pub mod shell;

use anyhow::{bail, Context, Result};
use heapview_core::{ProfilerConfig, CONFIG_FILE};
use std::path::Path;

/// How command output is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Result<Self> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("Unknown format: {}. Use 'json' or 'text'.", other),
        }
    }
}

/// Loads the config named on the command line, or `./heapview.toml` if it
/// exists.
pub fn load_config(path: Option<&Path>) -> Result<ProfilerConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            ProfilerConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => ProfilerConfig::load(Path::new(CONFIG_FILE)).context("Failed to load heapview.toml"),
    }
}
