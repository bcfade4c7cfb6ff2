use crate::model::SecondRow;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "lcdplay";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "lcdplay.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output device name; `None` picks the system default.
    pub output_device: Option<String>,
    pub input_poll_ms: u64,
    /// Decoded chunks allowed to sit in the output queue.
    pub output_queue_depth: usize,
    pub second_row: SecondRow,
    pub log_filter: String,
    pub farewell_ms: u64,
    pub title_width: usize,
    pub row_width: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_device: None,
            input_poll_ms: 33,
            output_queue_depth: 2,
            second_row: SecondRow::Artist,
            log_filter: String::from("info"),
            farewell_ms: 1000,
            title_width: 15,
            row_width: 16,
        }
    }
}

impl Settings {
    pub fn input_poll(&self) -> Duration {
        Duration::from_millis(self.input_poll_ms.max(1))
    }

    pub fn farewell(&self) -> Duration {
        Duration::from_millis(self.farewell_ms)
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("LCDPLAY_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(config_root()?.join(LOG_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    ensure_config_dir()?;
    let path = settings_path()?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var("LCDPLAY_CONFIG_DIR", dir.path().to_string_lossy().as_ref());
        }

        let settings = Settings {
            second_row: SecondRow::Album,
            output_device: Some(String::from("USB DAC")),
            ..Settings::default()
        };
        save_settings(&settings).expect("save");
        let loaded = load_settings().expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_settings_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "farewell_ms": 0, "second_row": "album" }"#).expect("write");

        let loaded = load_settings_from(&path).expect("load");
        assert_eq!(loaded.farewell(), Duration::ZERO);
        assert_eq!(loaded.second_row, SecondRow::Album);
        assert_eq!(loaded.input_poll_ms, 33);
        assert_eq!(loaded.title_width, 15);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").expect("write");

        let err = load_settings_from(&path).expect_err("parse should fail");
        assert!(err.to_string().contains("failed to parse settings file"));
    }
}
