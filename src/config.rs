//! Persistent application configuration model and defaults.

use std::path::PathBuf;

use log::warn;

use crate::protocol::RepeatMode;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Library indexing preferences.
    pub library: LibraryConfig,
    #[serde(default)]
    /// Metadata enrichment preferences.
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    /// Playback preferences restored at startup.
    pub playback: PlaybackConfig,
}

/// Library indexing preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub folders: Vec<String>,
    /// Install the built-in demo tracks when no folder yields audio.
    #[serde(default = "default_true")]
    pub demo_fallback: bool,
}

/// Metadata enrichment preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub online_metadata_enabled: bool,
    #[serde(default = "default_true")]
    pub artwork_enabled: bool,
}

/// Playback preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_repeat_mode")]
    pub repeat_mode: RepeatMode,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            demo_fallback: true,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            online_metadata_enabled: true,
            artwork_enabled: true,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat_mode: RepeatMode::Off,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_repeat_mode() -> RepeatMode {
    RepeatMode::Off
}

fn config_file_path() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| "Could not find config directory".to_string())?
        .join("resona");
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| format!("Could not create config directory: {e}"))?;
    }
    Ok(config_dir.join("config.toml"))
}

/// Loads the configuration, writing a default file on first run.
///
/// An unparseable file is reported and replaced by defaults in memory,
/// never overwritten on disk.
pub fn load_or_create() -> Result<Config, String> {
    let path = config_file_path()?;

    if !path.exists() {
        let config = Config::default();
        save(&config)?;
        return Ok(config);
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| format!("Could not read {}: {e}", path.display()))?;
    match toml::from_str(&contents) {
        Ok(config) => Ok(config),
        Err(err) => {
            warn!(
                "Config: {} is unparseable ({err}); using defaults",
                path.display()
            );
            Ok(Config::default())
        }
    }
}

/// Persists the configuration to `config.toml`.
pub fn save(config: &Config) -> Result<(), String> {
    let path = config_file_path()?;
    let contents =
        toml::to_string(config).map_err(|e| format!("Could not serialize config: {e}"))?;
    std::fs::write(&path, contents).map_err(|e| format!("Could not write {}: {e}", path.display()))
}
