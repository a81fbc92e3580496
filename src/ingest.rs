//! Conversion of externally generated item descriptors into cost nodes.

use crate::calculations::rollup::{recalculate, wbs_code};
use crate::node::{CostCategory, CostNode, NodeKind};
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUANTITY: f64 = 1.0;
pub const DEFAULT_UNIT: &str = "ls";
pub const DEFAULT_UNIT_PRICE: f64 = 0.0;
pub const DEFAULT_CATEGORY: CostCategory = CostCategory::Material;
pub const UNNAMED_ITEM: &str = "Unnamed Item";

/// Loosely typed item as produced by the generation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemDescriptor {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    /// Kept as text so an unknown category falls back instead of failing the batch.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "subItems")]
    pub children: Option<Vec<RawItemDescriptor>>,
}

impl RawItemDescriptor {
    pub fn new(description: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn with_price(mut self, quantity: f64, unit: impl Into<String>, unit_price: f64) -> Self {
        self.quantity = Some(quantity);
        self.unit = Some(unit.into());
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_children(mut self, children: Vec<RawItemDescriptor>) -> Self {
        self.children = Some(children);
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestRejection {
    #[error("item {position} has neither a description nor a category")]
    MissingDescriptionAndCategory { position: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// Recomputed nodes, numbered as if they were the whole tree.
    pub nodes: Vec<CostNode>,
    pub rejected: Vec<IngestRejection>,
}

pub fn parse_descriptors(json: &str) -> Result<Vec<RawItemDescriptor>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Converts a batch, filling defaults and dropping unusable descriptors.
pub fn ingest(descriptors: Vec<RawItemDescriptor>) -> IngestOutcome {
    let mut rejected = Vec::new();
    let nodes = convert_all(descriptors, "", &mut rejected);
    for rejection in &rejected {
        tracing::warn!(%rejection, "dropped generated item");
    }
    let nodes = recalculate(nodes);
    tracing::info!(
        accepted = nodes.len(),
        rejected = rejected.len(),
        "ingested generated items"
    );
    IngestOutcome { nodes, rejected }
}

fn convert_all(
    descriptors: Vec<RawItemDescriptor>,
    prefix: &str,
    rejected: &mut Vec<IngestRejection>,
) -> Vec<CostNode> {
    descriptors
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let position = wbs_code(prefix, index);
            convert(raw, &position, rejected)
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn usable_amount(value: Option<f64>) -> Option<f64> {
    value.filter(|amount| amount.is_finite() && *amount >= 0.0)
}

fn convert(
    raw: RawItemDescriptor,
    position: &str,
    rejected: &mut Vec<IngestRejection>,
) -> Option<CostNode> {
    let description = non_blank(raw.description);
    let category_text = non_blank(raw.category);
    if description.is_none() && category_text.is_none() {
        rejected.push(IngestRejection::MissingDescriptionAndCategory {
            position: position.to_string(),
        });
        return None;
    }

    let category = category_text
        .as_deref()
        .and_then(CostCategory::from_str)
        .unwrap_or(DEFAULT_CATEGORY);
    let mut node = CostNode::terminal(
        description.unwrap_or_else(|| UNNAMED_ITEM.to_string()),
        usable_amount(raw.quantity).unwrap_or(DEFAULT_QUANTITY),
        non_blank(raw.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        usable_amount(raw.unit_price).unwrap_or(DEFAULT_UNIT_PRICE),
        category,
    );
    node.notes = non_blank(raw.notes);
    node.expanded = true;

    if let Some(children) = raw.children.filter(|children| !children.is_empty()) {
        node.kind = NodeKind::Group {
            children: convert_all(children, position, rejected),
        };
    }
    Some(node)
}
