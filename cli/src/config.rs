// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, path::PathBuf, str::FromStr};

use callsync_core::CoreConfig;
use callsync_gcal::GcalConfig;
use tokio::fs;

const CALLSYNC_CONFIG_ENV: &str = "CALLSYNC_CONFIG";

const APP_NAME: &str = "callsync";

/// Parsed configuration for one invocation.
///
/// Resolution order: `--config` flag, then `CALLSYNC_CONFIG`, then
/// `config.toml` in the user config directory. A missing default file is
/// not an error; everything has a default except the OAuth client, which
/// `auth login` checks for itself.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub core: CoreConfig,
    pub calendar: CalendarSection,
}

pub async fn parse_config(path: Option<PathBuf>) -> Result<Config, Box<dyn Error>> {
    let path = if let Some(path) = path {
        path
    } else if let Ok(env_path) = std::env::var(CALLSYNC_CONFIG_ENV) {
        PathBuf::from(env_path)
    } else {
        let config = get_config_dir()?.join(format!("{APP_NAME}/config.toml"));
        if !config.exists() {
            tracing::debug!(path = %config.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        config
    };

    fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read config file at {}: {e}", path.display()))?
        .parse::<ConfigRaw>()
        .map(|raw| Config {
            core: raw.core,
            calendar: raw.calendar,
        })
}

/// The `[calendar]` section of `config.toml`.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarSection {
    pub calendar_name: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl CalendarSection {
    pub fn to_gcal_config(&self) -> GcalConfig {
        let mut config = GcalConfig::default();
        if let Some(name) = &self.calendar_name {
            config.calendar_name = name.clone();
        }
        if let Some(id) = &self.client_id {
            config.client_id = id.clone();
        }
        if let Some(secret) = &self.client_secret {
            config.client_secret = secret.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        config
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigRaw {
    #[serde(default)]
    core: CoreConfig,
    #[serde(default)]
    calendar: CalendarSection,
}

impl FromStr for ConfigRaw {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

fn get_config_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir.ok_or_else(|| "User-specific home directory not found".into())
}
