use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{
    db::{AnyStore, HttpProjectStore, ProjectDb},
    scenario::Priority,
    wizard::AnalysisSettings,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub analysis: AnalysisConfig,
    pub map: MapSettings,
    pub log: LogSettings,
    pub server: ServerSettings,
}

/// Where projects live. `url` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub url: Option<String>,
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub progress_step_ms: u64,
    pub default_target: u8,
    pub default_priority: Priority,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            progress_step_ms: 400,
            default_target: 25,
            default_priority: Priority::Balanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub provider_url: Option<String>,
    pub load_timeout_secs: u64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            provider_url: None,
            load_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a TOML file; every missing key keeps its default.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            target_percent: self.analysis.default_target,
            priority: self.analysis.default_priority,
            step_delay: Duration::from_millis(self.analysis.progress_step_ms),
        }
    }

    pub fn map_timeout(&self) -> Duration {
        Duration::from_secs(self.map.load_timeout_secs)
    }

    pub async fn open_store(&self) -> anyhow::Result<AnyStore> {
        match (&self.store.url, &self.store.database) {
            (Some(url), _) => Ok(AnyStore::Http(HttpProjectStore::new(url.clone()))),
            (None, Some(database)) => Ok(AnyStore::Local(ProjectDb::new(database).await?)),
            (None, None) => {
                anyhow::bail!("No project store configured: pass --store-url or --database")
            }
        }
    }
}
