//! Alternate groupings of the canonical tree.
//!
//! A derived view is rebuilt from scratch on every call and owns nothing: the
//! terminal nodes it carries keep their canonical ids, so any edit made through a
//! view is applied to the canonical tree by id and the view is projected again.

use crate::calculations::rollup::wbs_code;
use crate::node::{CostCategory, CostNode, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const UNASSIGNED_LABEL: &str = "Unassigned / General";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Standard,
    Contract,
    Risk,
    Category,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Standard,
        ViewMode::Contract,
        ViewMode::Risk,
        ViewMode::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Standard => "standard",
            ViewMode::Contract => "contract",
            ViewMode::Risk => "risk",
            ViewMode::Category => "category",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Standard => "Standard",
            ViewMode::Contract => "Contract Type",
            ViewMode::Risk => "Risk Level",
            ViewMode::Category => "Cost Category",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|mode| {
            mode.as_str().eq_ignore_ascii_case(value) || mode.label().eq_ignore_ascii_case(value)
        })
    }

    /// Anything but the canonical grouping. Structure is read-only in derived views.
    pub fn is_derived(&self) -> bool {
        !matches!(self, ViewMode::Standard)
    }

    fn bucket_key(&self, node: &CostNode) -> Option<&'static str> {
        match self {
            ViewMode::Standard => None,
            ViewMode::Contract => node.contract_type.map(|tag| tag.as_str()),
            ViewMode::Risk => node.risk_level.map(|tag| tag.as_str()),
            ViewMode::Category => Some(node.category.as_str()),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal nodes in depth-first order. Groups, empty or not, are never yielded.
pub fn flatten_terminals(nodes: &[CostNode]) -> Vec<&CostNode> {
    fn walk<'a>(nodes: &'a [CostNode], out: &mut Vec<&'a CostNode>) {
        for node in nodes {
            match &node.kind {
                NodeKind::Group { children } => walk(children, out),
                NodeKind::Terminal(_) => out.push(node),
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

/// Display tree for `mode`. Standard borrows the canonical tree as is.
pub fn project(nodes: &[CostNode], mode: ViewMode) -> Cow<'_, [CostNode]> {
    if !mode.is_derived() {
        return Cow::Borrowed(nodes);
    }

    let mut buckets: Vec<(&'static str, Vec<&CostNode>)> = Vec::new();
    let mut unassigned: Vec<&CostNode> = Vec::new();
    for node in flatten_terminals(nodes) {
        match mode.bucket_key(node) {
            Some(key) => match buckets.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(node),
                None => buckets.push((key, vec![node])),
            },
            None => unassigned.push(node),
        }
    }
    if !unassigned.is_empty() {
        buckets.push((UNASSIGNED_LABEL, unassigned));
    }

    let groups: Vec<CostNode> = buckets
        .into_iter()
        .enumerate()
        .map(|(index, (label, members))| synthesize_group(index, label, members))
        .collect();

    tracing::debug!(mode = mode.as_str(), groups = groups.len(), "projected view");
    Cow::Owned(groups)
}

fn synthesize_group(index: usize, label: &str, members: Vec<&CostNode>) -> CostNode {
    let prefix = wbs_code("", index);
    let children: Vec<CostNode> = members
        .into_iter()
        .enumerate()
        .map(|(member_index, node)| CostNode {
            wbs_code: wbs_code(&prefix, member_index),
            ..node.clone()
        })
        .collect();
    let total = children.iter().map(|child| child.total).sum();

    CostNode {
        id: NodeId::generate(),
        wbs_code: prefix,
        total,
        expanded: true,
        ..CostNode::group(label, CostCategory::Indirect).with_children(children)
    }
}
