use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EstimateStatus {
    #[default]
    Draft,
    Active,
    Completed,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateStatus::Draft => "Draft",
            EstimateStatus::Active => "Active",
            EstimateStatus::Completed => "Completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(EstimateStatus::Draft),
            "active" => Some(EstimateStatus::Active),
            "completed" => Some(EstimateStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateMetadata {
    pub project_name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: EstimateStatus,
    /// Display unit only; amounts are plain numbers.
    #[serde(default = "default_currency")]
    pub currency: String,
    pub last_modified: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for EstimateMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Estimate".to_string(),
            client: String::new(),
            location: String::new(),
            status: EstimateStatus::Draft,
            currency: default_currency(),
            last_modified: Utc::now(),
        }
    }
}

impl EstimateMetadata {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}
