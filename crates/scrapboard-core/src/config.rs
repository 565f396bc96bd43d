//! Tunable constants for boards and sessions.

use kurbo::{Size, Vec2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Allowed zoom scales, smallest first.
pub const ZOOM_STEPS: [f64; 16] = [
    0.02, 0.03, 0.05, 0.1, 0.15, 0.2, 0.33, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0,
];

/// Smallest size an object can be resized to, in board units.
pub const MIN_OBJECT_SIZE: Size = Size::new(16.0, 16.0);

/// Default board name.
pub const DEFAULT_BOARD_NAME: &str = "Untitled";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Zoom steps must be non-empty and strictly increasing")]
    ZoomSteps,
}

/// Board and session configuration.
///
/// Every field has a default, so a config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Allowed zoom scales (strictly increasing).
    pub zoom_steps: Vec<f64>,
    /// Size of the visible view in screen points.
    pub view_size: Size,
    /// Minimum object size for resize gestures.
    pub min_object_size: Size,
    /// Width given to newly placed images (height follows the aspect ratio).
    pub initial_image_width: f64,
    /// Size given to newly placed link cards.
    pub initial_link_size: Size,
    /// Offset between consecutive objects placed in one batch.
    pub placement_shift: f64,
    /// Offset applied to duplicated objects.
    pub duplicate_offset: Vec2,
    /// Maximum number of structural undo steps kept.
    pub max_undo_history: usize,
    /// Deadline for link metadata fetches, in milliseconds.
    pub link_fetch_timeout_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            zoom_steps: ZOOM_STEPS.to_vec(),
            view_size: Size::new(1024.0, 768.0),
            min_object_size: MIN_OBJECT_SIZE,
            initial_image_width: 200.0,
            initial_link_size: Size::new(200.0, 150.0),
            placement_shift: 20.0,
            duplicate_offset: Vec2::new(80.0, -80.0),
            max_undo_history: 50,
            link_fetch_timeout_ms: 10_000,
        }
    }
}

impl BoardConfig {
    /// Parse a config from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let increasing = self.zoom_steps.windows(2).all(|w| w[0] < w[1]);
        if self.zoom_steps.is_empty() || !increasing || self.zoom_steps[0] <= 0.0 {
            return Err(ConfigError::ZoomSteps);
        }
        Ok(())
    }

    pub fn min_zoom(&self) -> f64 {
        self.zoom_steps.first().copied().unwrap_or(1.0)
    }

    pub fn max_zoom(&self) -> f64 {
        self.zoom_steps.last().copied().unwrap_or(1.0)
    }

    /// Size of the virtual canvas the pan offset is clamped to.
    pub fn canvas_size(&self) -> Size {
        let min_zoom = self.min_zoom();
        Size::new(self.view_size.width / min_zoom, self.view_size.height / min_zoom)
    }

    pub fn link_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.link_fetch_timeout_ms)
    }
}
