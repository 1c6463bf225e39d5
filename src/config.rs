//! Host settings.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Simulation ticks per second.
    pub tick_hz: f64,
    /// Class file, JSON.
    pub classes: PathBuf,
    /// Level file, JSON.
    pub level: PathBuf,
    /// Hits a spacecraft takes before it is destroyed.
    pub hull_hits: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            tick_hz: 60.0,
            classes: PathBuf::from("assets/classes.json"),
            level: PathBuf::from("assets/level.json"),
            hull_hits: 3,
        }
    }
}

impl GameConfig {
    /// Read the config from `path`, falling back to the defaults if there is
    /// no such file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(GameConfig::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: GameConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if !(config.tick_hz.is_finite() && config.tick_hz > 0.0) {
            anyhow::bail!("tickHz must be positive, got {}", config.tick_hz);
        }
        Ok(config)
    }
}
