use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coords::MAP_GENERATION_LIMIT;

/// Runtime settings of one loaded world. Every field has a default so an
/// empty file is valid.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    /// Directory holding the block store.
    pub save_dir: PathBuf,
    /// Seconds a block may stay untouched before it is evicted.
    pub unload_timeout_s: f32,
    /// Absolute node coordinate limit for generation.
    pub generation_limit: i32,
    /// Seconds between liquid ticks.
    pub liquid_tick_s: f32,
    /// Consecutive viscosity reflows of one position before it is dropped
    /// from the queue.
    pub liquid_max_reflow: u32,
    /// Store map size in MiB.
    pub map_size_mb: usize,
    /// First air layer of the flat generator.
    pub flat_ground_y: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("world"),
            unload_timeout_s: 29.0 * 60.0,
            generation_limit: MAP_GENERATION_LIMIT,
            liquid_tick_s: 1.0,
            liquid_max_reflow: 64,
            map_size_mb: 1024,
            flat_ground_y: 0,
        }
    }
}

impl WorldConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let cfg: WorldConfig = toml::from_str(&text)?;
        if cfg.generation_limit <= 0 {
            return Err("generation_limit must be positive".into());
        }
        Ok(cfg)
    }
}
