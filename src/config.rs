//! Application configuration
//!
//! Stored as TOML under the user's config directory. A missing file is
//! created with defaults on first start; missing keys fall back to defaults
//! too, so older files keep loading after new settings are added.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::emdr::{SessionConfig, SessionSettings};

const CONFIG_DIR: &str = "emdr-pad";
const CONFIG_FILE: &str = "config.toml";
/// Overrides the config file location
pub const CONFIG_ENV: &str = "EMDR_PAD_CONFIG";

/// Which controller driver to use
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    #[default]
    Gilrs,
    Virtual,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    pub backend: GatewayBackend,
    /// Pads plugged in at start when running on the virtual backend
    pub virtual_controllers: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: GatewayBackend::Gilrs,
            virtual_controllers: 2,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub elapsed_interval_ms: u64,
    /// Switch EMDR off as soon as a poll sees anything but 2 controllers
    pub stop_on_disconnect: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            elapsed_interval_ms: 1000,
            stop_on_disconnect: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub monitor: MonitorConfig,
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Config file location, honouring `EMDR_PAD_CONFIG`
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Loads the config at `path`, writing defaults there if it does not exist
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check config file {}: {}", path.display(), e))?
        {
            info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
        config.validate()?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .map_err(|e| eyre!("Invalid [session] settings: {}", e))?;
        if self.monitor.poll_interval_ms == 0 || self.monitor.elapsed_interval_ms == 0 {
            return Err(eyre!("Monitor intervals must be greater than 0ms"));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            initial: self.session,
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            elapsed_interval: Duration::from_millis(self.monitor.elapsed_interval_ms),
            stop_on_disconnect: self.monitor.stop_on_disconnect,
        }
    }
}
