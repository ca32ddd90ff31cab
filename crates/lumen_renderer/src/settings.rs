//! Render settings, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Number of worker threads the machine offers.
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// User-facing renderer configuration.
///
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Maximum number of path bounces
    pub max_ray_depth: u32,
    /// Display gamma applied to the accumulated color
    pub gamma: f32,
    pub thread_count: usize,
    /// Average successive frames instead of showing the latest one
    pub accumulate: bool,
    /// Trace through the acceleration structures instead of brute force
    pub accelerate: bool,
    pub seed: u64,
    /// Constant radiance for rays that leave the scene (linear RGB)
    pub miss_color: [f32; 3],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_ray_depth: 5,
            gamma: 2.2,
            thread_count: available_threads(),
            accumulate: true,
            accelerate: true,
            seed: 0,
            miss_color: [0.6, 0.7, 0.9],
        }
    }
}

impl RenderSettings {
    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&json)?;
        log::debug!("Loaded render settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn to_json_string(&self) -> SettingsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
