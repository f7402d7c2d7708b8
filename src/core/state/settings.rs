use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::downloader::DEFAULT_DOWNLOAD_HOST;
use crate::core::error::{PanelError, PanelResult};
use crate::core::net::DEFAULT_ADDRESS_ENDPOINT;

pub const APP_DIR_NAME: &str = "BedrockPanel";
const SETTINGS_FILE: &str = "panel_settings.json";

/// Panel preferences persisted as `panel_settings.json` in the data dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Directory holding one subdirectory per installed server version.
    pub install_root: PathBuf,
    pub download_host: String,
    pub address_endpoint: String,
}

impl PanelSettings {
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            install_root: data_dir.join("servers"),
            download_host: DEFAULT_DOWNLOAD_HOST.to_string(),
            address_endpoint: DEFAULT_ADDRESS_ENDPOINT.to_string(),
        }
    }

    /// Read settings from `data_dir`, falling back to defaults when the file
    /// is missing or corrupt.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Self::for_data_dir(data_dir),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Corrupt settings file {:?}: {}", path, e);
                Self::for_data_dir(data_dir)
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> PanelResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| PanelError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| PanelError::io(&path, e))
    }
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self::for_data_dir(&default_data_dir())
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_data_dir() -> PathBuf {
    default_base_dir().join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::TempDir;

    #[test]
    fn missing_file_gives_defaults_under_data_dir() {
        let dir = TempDir::new("settings");
        let settings = PanelSettings::load(&dir);
        assert_eq!(settings.install_root, dir.join("servers"));
        assert_eq!(settings.download_host, "www.minecraft.net");
        assert_eq!(settings.address_endpoint, DEFAULT_ADDRESS_ENDPOINT);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new("settings");
        let settings = PanelSettings {
            install_root: PathBuf::from("/srv/bedrock"),
            download_host: "mirror.example.test".into(),
            address_endpoint: "https://ip.example.test/ip".into(),
        };

        settings.save(&dir).unwrap();
        assert_eq!(PanelSettings::load(&dir), settings);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new("settings");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SETTINGS_FILE), "{ not json").unwrap();

        assert_eq!(PanelSettings::load(&dir), PanelSettings::for_data_dir(&dir));
    }
}
