use serde::{Deserialize, Serialize};

use crate::usage::types::{CostMode, Source};

pub const APP_NAME: &str = "ccdeck";
pub const DEFAULT_PORT: u16 = 4545;

/// Persisted application configuration (`~/.config/ccdeck/default-config.toml`
/// via confy). Dashboard defaults are only seeds for the client settings
/// panel; every load call still receives its options explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub defaults: DashboardDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: DEFAULT_PORT }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardDefaults {
    pub source: Source,
    pub cost_mode: CostMode,
    pub start_of_week: String,
    pub timezone: String,
    pub show_breakdown: bool,
}

impl Default for DashboardDefaults {
    fn default() -> Self {
        DashboardDefaults {
            source: Source::Claude,
            cost_mode: CostMode::Auto,
            start_of_week: "sunday".to_string(),
            timezone: "local".to_string(),
            show_breakdown: false,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(confy::load(APP_NAME, None)?)
}

pub fn save_config(config: &Config) -> anyhow::Result<()> {
    confy::store(APP_NAME, None, config)?;
    Ok(())
}
