//! # Configuration Management Module
//!
//! Wordwarden reads a single TOML file. Every section has defaults, so a
//! missing key falls back to the value `wordwarden init` would write.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - World selection and the session seed
//! - [`EngineSettings`] - Hint thresholds, vocabulary flag, payload limit
//! - [`StorageConfig`] - Save slot database location
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! title = "The Synonym Gorge"
//! # seeds_dir = "./data/seeds"   # omit to use the built-in world
//! seed = 1337
//!
//! [engine]
//! hint_thresholds = [3, 5, 8]
//! vocabulary_flag_threshold = 10
//! max_payload_bytes = 1024
//!
//! [storage]
//! data_dir = "./data"
//! default_slot = "autosave"
//!
//! [logging]
//! level = "info"
//! file = "wordwarden.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::engine::EngineConfig;
use crate::validation::validate_slot_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Shown in the banner when no world title overrides it.
    pub title: String,
    /// Directory of seed JSON files. Unset means the compiled-in world.
    #[serde(default)]
    pub seeds_dir: Option<String>,
    /// Session seed for passphrase generation. Unset picks one at random per session.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "Wordwarden".to_string(),
            seeds_dir: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_hint_thresholds")]
    pub hint_thresholds: Vec<u32>,
    #[serde(default = "default_vocabulary_flag_threshold")]
    pub vocabulary_flag_threshold: usize,
    /// Longer input is truncated (on a char boundary) before evaluation.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

fn default_hint_thresholds() -> Vec<u32> {
    vec![3, 5, 8]
}

fn default_vocabulary_flag_threshold() -> usize {
    10
}

fn default_max_payload_bytes() -> usize {
    1024
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            hint_thresholds: default_hint_thresholds(),
            vocabulary_flag_threshold: default_vocabulary_flag_threshold(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl EngineSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            hint_thresholds: self.hint_thresholds.clone(),
            vocabulary_flag_threshold: self.vocabulary_flag_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Slot used by `play` when none is named.
    pub default_slot: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            default_slot: "autosave".to_string(),
        }
    }
}

impl StorageConfig {
    /// Path of the sled database holding save slots.
    pub fn slots_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("slots")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("wordwarden.log".to_string()),
        }
    }
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content).map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.hint_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(anyhow!("engine.hint_thresholds must be strictly ascending"));
        }
        if self.engine.hint_thresholds.first() == Some(&0) {
            return Err(anyhow!("engine.hint_thresholds must start above zero"));
        }
        if self.engine.vocabulary_flag_threshold == 0 {
            return Err(anyhow!("engine.vocabulary_flag_threshold must be at least 1"));
        }
        if self.engine.max_payload_bytes < 16 {
            return Err(anyhow!("engine.max_payload_bytes must be at least 16"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        validate_slot_name(&self.storage.default_slot)
            .map_err(|e| anyhow!("storage.default_slot: {}", e))?;
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(anyhow!(
                "logging.level '{}' must be one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            game: GameConfig {
                seed: Some(1337),
                ..GameConfig::default()
            },
            engine: EngineSettings::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
