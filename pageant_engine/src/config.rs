//! Engine tuning values.
//!
//! Loaded from `pageant.toml` in the data directory. Every field has a default,
//! so a partial file only overrides what it names, and a missing or malformed
//! file falls back to the defaults entirely.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime constants used by the interpreter and the movement code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pixels per tile.
    pub tile_size: i32,
    /// Pixels per tick for scripted NPC motion.
    pub npc_speed: f32,
    /// Pixels per tick for scripted player motion.
    pub farmer_speed: f32,
    /// Pixels the target tile is inflated by when testing arrival.
    pub arrival_slop: i32,
    /// Number of header commands (music, camera, layout) before normal execution.
    pub header_len: usize,
    /// Commands starting with this marker are skipped without dispatch.
    pub comment_marker: String,
    pub emote_ms: f32,
    /// Fade speed used when `globalFade` omits one.
    pub default_fade_speed: f32,
    pub jump_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: 64,
            npc_speed: 2.0,
            farmer_speed: 3.0,
            arrival_slop: 4,
            header_len: 3,
            comment_marker: "--".to_string(),
            emote_ms: 640.0,
            default_fade_speed: 0.007,
            jump_ms: 400.0,
        }
    }
}

/// Load engine configuration from a TOML file, falling back to defaults on error.
///
/// # Logging
/// - `info!` on successful load
/// - `warn!` if the file cannot be read or parsed
pub fn load_config(toml_path: &Path) -> EngineConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!("engine config loaded from '{}'", toml_path.display());
            config
        },
        Err(e) => {
            warn!(
                "Could not load engine config from '{}': {:#}. Using defaults.",
                toml_path.display(),
                e
            );
            EngineConfig::default()
        },
    }
}

/// Attempt to load engine configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read, cannot be parsed, or holds
/// values the engine cannot work with (non-positive tile size or speeds).
pub fn try_load_config(toml_path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(toml_path)
        .with_context(|| format!("reading engine config from '{}'", toml_path.display()))?;
    let config: EngineConfig =
        toml::from_str(&text).with_context(|| format!("parsing engine config from '{}'", toml_path.display()))?;
    if config.tile_size <= 0 {
        anyhow::bail!("tile_size must be positive (got {})", config.tile_size);
    }
    let usable = |speed: f32| speed.is_finite() && speed > 0.0;
    if !usable(config.npc_speed) || !usable(config.farmer_speed) {
        anyhow::bail!("movement speeds must be positive and finite");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "npc_speed = 4.5\ncomment_marker = \"#\"").unwrap();
        let config = try_load_config(file.path()).unwrap();
        assert_eq!(config.npc_speed, 4.5);
        assert_eq!(config.comment_marker, "#");
        assert_eq!(config.tile_size, 64);
        assert_eq!(config.header_len, 3);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tile_size = \"big\"").unwrap();
        assert!(try_load_config(file.path()).is_err());
        assert_eq!(load_config(file.path()), EngineConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("definitely/not/here/pageant.toml"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn non_finite_speed_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "npc_speed = nan").unwrap();
        assert!(try_load_config(file.path()).is_err());
    }

    #[test]
    fn zero_tile_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tile_size = 0").unwrap();
        assert!(try_load_config(file.path()).is_err());
    }
}
