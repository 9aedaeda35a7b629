//! Configuration for a map view model
//!
//! Presets cover the common cases; a configuration can also be read from
//! JSON, with every field optional.

use serde::{Deserialize, Serialize};

use crate::core::constants::MAX_ZOOM;
use crate::{MapError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileViewConfig {
    /// Zoom level the view model starts at; clamped to the zoom domain
    pub initial_zoom: u8,
    /// Upper bound on simultaneously running tile fetches; `None` means all
    /// tiles of all grids are fetched at once
    pub max_concurrent_fetches: Option<usize>,
    /// Log every zoom, viewport and tile size tick at debug level
    pub log_inputs: bool,
}

impl Default for TileViewConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 0,
            max_concurrent_fetches: None,
            log_inputs: true,
        }
    }
}

impl TileViewConfig {
    pub fn low_resource() -> Self {
        Self {
            max_concurrent_fetches: Some(4),
            log_inputs: false,
            ..Self::default()
        }
    }

    pub fn for_testing() -> Self {
        Self {
            max_concurrent_fetches: None,
            log_inputs: false,
            ..Self::default()
        }
    }

    pub fn with_initial_zoom(mut self, zoom: u8) -> Self {
        self.initial_zoom = zoom;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    /// Initial zoom clamped to the zoom domain
    pub fn clamped_initial_zoom(&self) -> u8 {
        self.initial_zoom.min(MAX_ZOOM)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == Some(0) {
            return Err(MapError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MapError::Config(e.to_string()))
    }
}
