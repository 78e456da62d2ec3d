//! Configuration loader - YAML file loading and parsing
//!
//! Also reads newline-delimited JSON event files for batch runs.

use super::types::RemedyConfig;
use crate::remedy::condition::Event;
use crate::runtime::error::RemedyError;
use std::fs;
use std::path::Path;

/// Loads engine configuration and event files
pub struct RemedyLoader;

impl RemedyLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a configuration from a YAML file
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<RemedyConfig, RemedyError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<RemedyConfig, RemedyError> {
        let config: RemedyConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load events from a file holding one JSON object per line
    pub fn load_events<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Event>, RemedyError> {
        let content = fs::read_to_string(path)?;
        Self::parse_events(&content)
    }

    /// Parse newline-delimited JSON events; blank lines are skipped
    pub fn parse_events(content: &str) -> Result<Vec<Event>, RemedyError> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_str::<Event>(line).map_err(RemedyError::from))
            .collect()
    }
}

impl Default for RemedyLoader {
    fn default() -> Self {
        Self::new()
    }
}
