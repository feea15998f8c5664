//! Optional per-run YAML configuration.
//!
//! CLI flags cover the common cases; the config file holds the settings
//! that are awkward on a command line (table lists, sampling caps). Flags
//! win over file values where both are given.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Only emit data for these tables (derived names).
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    /// Never emit data for these tables.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// Capacity of the bad-row sample buffer.
    #[serde(default)]
    pub bad_row_samples: Option<usize>,
    /// Session time zone override (e.g. "UTC", "+02:00").
    #[serde(default)]
    pub timezone: Option<String>,
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("can't read config file {}: {e}", path.as_ref().display())
        })?;
        let config: RunConfig = serde_yaml_ng::from_str(&text)?;
        Ok(config)
    }
}
