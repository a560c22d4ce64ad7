use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV_VAR: &str = "FLATWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "flatwatch.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub locations_url: String,
    pub count_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            locations_url: "https://www.immobilienscout24.de/geoautocomplete/v3/locations.json"
                .into(),
            count_url:
                "https://www.immobilienscout24.de/Suche/controller/oneStepSearch/resultCount.json"
                    .into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pause between two poll cycles.
    pub poll_interval_secs: u64,
    /// Pause between two count queries inside one cycle.
    pub request_pacing_ms: u64,
    pub throttle_window_secs: u64,
    pub database_path: PathBuf,
    /// Owner id used for everything typed into the console transport.
    pub console_owner_id: i64,
    pub source: SourceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            request_pacing_ms: 500,
            throttle_window_secs: 5,
            database_path: PathBuf::from("flatwatch.sqlite3"),
            console_owner_id: 1,
            source: SourceSettings::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `FLATWATCH_CONFIG`, or `flatwatch.json` in the
    /// working directory.
    pub fn load_from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(&path)
    }

    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            log::info!("No settings file at {}, using defaults", path.display());
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }
        if self.source.timeout_secs == 0 {
            bail!("source.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_pacing(&self) -> Duration {
        Duration::from_millis(self.request_pacing_ms)
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.throttle_window_secs)
    }
}
