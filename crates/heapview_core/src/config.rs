//! Configuration for a profiler session.

use crate::classify::DEFAULT_SUMMARY_LIMIT;
use crate::diff::FirstCapturePolicy;
use crate::error::{ProfilerError, Result};
use crate::graph::{GraphConfig, MAX_DEPTH};
use crate::paging::{PageRounding, PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file name.
pub const CONFIG_FILE: &str = "heapview.toml";

/// Complete profiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Listing and overview settings.
    #[serde(default)]
    pub listing: ListingConfig,

    /// Leak detection settings.
    #[serde(default)]
    pub leaks: LeakConfig,

    /// Reference chain settings.
    #[serde(default)]
    pub graph: GraphSettings,
}

impl ProfilerConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ProfilerError::ConfigError(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProfilerError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.listing.page_size == 0 {
            return Err(ProfilerError::ConfigError(
                "listing.page_size must be at least 1".into(),
            ));
        }
        if self.listing.summary_limit <= 3 {
            return Err(ProfilerError::ConfigError(
                "listing.summary_limit must be greater than 3".into(),
            ));
        }
        if self.graph.max_depth > MAX_DEPTH {
            return Err(ProfilerError::ConfigError(format!(
                "graph.max_depth must be at most {}",
                MAX_DEPTH
            )));
        }
        Ok(())
    }
}

/// Listing and overview settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingConfig {
    /// Entries per page (default: 500).
    pub page_size: usize,

    /// Maximum summary length in listings, in characters (default: 250).
    pub summary_limit: usize,

    /// Number of kinds shown on the overview (default: 30).
    pub overview_limit: usize,

    /// Page count rounding (default: ceil).
    pub rounding: PageRounding,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            summary_limit: DEFAULT_SUMMARY_LIMIT,
            overview_limit: 30,
            rounding: PageRounding::Ceil,
        }
    }
}

/// Leak detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LeakConfig {
    /// What the first capture reports (default: baseline_only).
    pub first_capture: FirstCapturePolicy,
}

/// Reference chain settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraphSettings {
    /// Maximum chain depth (default: 20, also the hard cap).
    pub max_depth: usize,

    /// Maximum nodes per chain (default: 200).
    pub max_nodes: usize,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: 200,
        }
    }
}

impl GraphSettings {
    /// Walk limits for [`reference_graph`](crate::reference_graph).
    pub fn walk_config(&self) -> GraphConfig {
        GraphConfig {
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
            ..Default::default()
        }
    }
}
