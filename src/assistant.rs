//! Interface of the external item-generation and narrative-analysis service.
//!
//! The workspace is handed an implementation at construction time; nothing in
//! the crate reaches a network service on its own.

use crate::ingest::RawItemDescriptor;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant is not configured")]
    Unavailable,
    #[error("assistant request failed: {0}")]
    Failed(String),
}

pub trait EstimateAssistant: Send + Sync {
    /// Proposes items for a free-text scope description.
    fn generate(&self, prompt: &str) -> Result<Vec<RawItemDescriptor>, AssistantError>;

    /// Narrative risk review of an analysis payload. The text is not interpreted.
    fn summarize(&self, payload: &str) -> Result<String, AssistantError>;
}

/// Canned assistant for offline use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAssistant {
    pub items: Vec<RawItemDescriptor>,
    pub narrative: String,
}

impl StaticAssistant {
    pub fn new(items: Vec<RawItemDescriptor>, narrative: impl Into<String>) -> Self {
        Self {
            items,
            narrative: narrative.into(),
        }
    }
}

impl EstimateAssistant for StaticAssistant {
    fn generate(&self, prompt: &str) -> Result<Vec<RawItemDescriptor>, AssistantError> {
        if prompt.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.items.clone())
    }

    fn summarize(&self, _payload: &str) -> Result<String, AssistantError> {
        Ok(self.narrative.clone())
    }
}
