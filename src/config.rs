//! Configuration types for glessink

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sink configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Create an internal window when no external handle was supplied
    pub create_window: bool,
    /// Preserve the frame's aspect ratio when scaling to the surface
    pub force_aspect_ratio: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            create_window: true,
            force_aspect_ratio: true,
        }
    }
}

impl SinkConfig {
    pub fn with_create_window(mut self, create: bool) -> Self {
        self.create_window = create;
        self
    }

    pub fn with_force_aspect_ratio(mut self, force: bool) -> Self {
        self.force_aspect_ratio = force;
        self
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}
