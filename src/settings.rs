use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

pub const SETTINGS_PATH_ENV: &str = "ESTIMATE_TOOL_SETTINGS";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Defaults applied when nodes, detail sheets and reports are created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateSettings {
    pub default_hours_per_day: f64,
    pub default_duration_days: f64,
    pub root_item_unit: String,
    pub child_item_unit: String,
    pub top_cost_items: usize,
    pub currency: String,
}

impl Default for EstimateSettings {
    fn default() -> Self {
        Self {
            default_hours_per_day: 8.0,
            default_duration_days: 1.0,
            root_item_unit: "ls".to_string(),
            child_item_unit: "ea".to_string(),
            top_cost_items: 5,
            currency: "USD".to_string(),
        }
    }
}

impl EstimateSettings {
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let file = File::open(path)?;
        let settings = serde_json::from_reader(file)?;
        Ok(settings)
    }

    pub fn save_to_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Reads the file named by `ESTIMATE_TOOL_SETTINGS`, falling back to defaults.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(SETTINGS_PATH_ENV) else {
            return Self::default();
        };
        match Self::load_from_json(&path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(%path, %err, "failed to load estimate settings, using defaults");
                Self::default()
            }
        }
    }
}
