//! Pure, path-preserving edits of the canonical tree.
//!
//! Every operator consumes the sibling sequence and hands back the edited one.
//! Nodes off the path to the target are moved through untouched. A missing
//! target is not an error: the input comes back unchanged. Callers must run the
//! result through [`crate::calculations::rollup::recalculate`] before treating
//! it as canonical.

use crate::calculations::crew_hours;
use crate::node::{ContractType, CostCategory, CostNode, NodeId, NodeKind, RiskLevel};
use crate::node_validation::{ValidationError, validate_amount};
use crate::resource::ResourceLine;
use serde::{Deserialize, Serialize};

/// Depth-first search by id; replaces the first match with `transform(node)`.
pub fn find_and_apply<F>(nodes: Vec<CostNode>, target: &NodeId, transform: F) -> Vec<CostNode>
where
    F: FnOnce(CostNode) -> CostNode,
{
    let mut transform = Some(transform);
    apply_first(nodes, target, &mut transform)
}

fn apply_first<F>(nodes: Vec<CostNode>, target: &NodeId, transform: &mut Option<F>) -> Vec<CostNode>
where
    F: FnOnce(CostNode) -> CostNode,
{
    nodes
        .into_iter()
        .map(|mut node| {
            if transform.is_none() {
                return node;
            }
            if &node.id == target {
                return match transform.take() {
                    Some(apply) => apply(node),
                    None => node,
                };
            }
            if let NodeKind::Group { children } = &mut node.kind {
                let taken = std::mem::take(children);
                *children = apply_first(taken, target, transform);
            }
            node
        })
        .collect()
}

pub fn find_node<'a>(nodes: &'a [CostNode], id: &NodeId) -> Option<&'a CostNode> {
    for node in nodes {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = node.children().and_then(|children| find_node(children, id)) {
            return Some(found);
        }
    }
    None
}

pub fn contains(nodes: &[CostNode], id: &NodeId) -> bool {
    find_node(nodes, id).is_some()
}

/// Typed single-field edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value")]
pub enum NodeEdit {
    #[serde(rename = "description")]
    SetDescription(String),
    #[serde(rename = "quantity")]
    SetQuantity(f64),
    #[serde(rename = "unit")]
    SetUnit(String),
    #[serde(rename = "unit_price")]
    SetUnitPrice(f64),
    #[serde(rename = "category")]
    SetCategory(CostCategory),
    #[serde(rename = "contract_type")]
    SetContractType(Option<ContractType>),
    #[serde(rename = "risk_level")]
    SetRiskLevel(Option<RiskLevel>),
    #[serde(rename = "notes")]
    SetNotes(Option<String>),
    /// Terminal only. Re-syncs labor/equipment lines.
    #[serde(rename = "duration")]
    SetDuration(f64),
    /// Terminal only. Re-syncs labor/equipment lines.
    #[serde(rename = "hours_per_day")]
    SetHoursPerDay(f64),
    /// Terminal only.
    #[serde(rename = "resources")]
    SetResources(Vec<ResourceLine>),
}

impl NodeEdit {
    pub fn field_name(&self) -> &'static str {
        match self {
            NodeEdit::SetDescription(_) => "description",
            NodeEdit::SetQuantity(_) => "quantity",
            NodeEdit::SetUnit(_) => "unit",
            NodeEdit::SetUnitPrice(_) => "unit_price",
            NodeEdit::SetCategory(_) => "category",
            NodeEdit::SetContractType(_) => "contract_type",
            NodeEdit::SetRiskLevel(_) => "risk_level",
            NodeEdit::SetNotes(_) => "notes",
            NodeEdit::SetDuration(_) => "duration",
            NodeEdit::SetHoursPerDay(_) => "hours_per_day",
            NodeEdit::SetResources(_) => "resources",
        }
    }

    /// Edits that only exist on terminal nodes and are dropped on groups.
    pub fn is_terminal_only(&self) -> bool {
        matches!(
            self,
            NodeEdit::SetDuration(_) | NodeEdit::SetHoursPerDay(_) | NodeEdit::SetResources(_)
        )
    }

    /// Rejects NaN, infinite and negative numbers before anything is applied.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            NodeEdit::SetQuantity(value)
            | NodeEdit::SetUnitPrice(value)
            | NodeEdit::SetDuration(value)
            | NodeEdit::SetHoursPerDay(value) => validate_amount(self.field_name(), *value),
            NodeEdit::SetResources(lines) => {
                for line in lines {
                    validate_amount("resource quantity", line.quantity)?;
                    validate_amount("resource unit_price", line.unit_price)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Terminal-only edits are ignored on groups. Category never changes the node kind.
    pub fn apply(self, mut node: CostNode) -> CostNode {
        match self {
            NodeEdit::SetDescription(value) => node.description = value,
            NodeEdit::SetQuantity(value) => node.quantity = value,
            NodeEdit::SetUnit(value) => node.unit = value,
            NodeEdit::SetUnitPrice(value) => node.unit_price = value,
            NodeEdit::SetCategory(value) => node.category = value,
            NodeEdit::SetContractType(value) => node.contract_type = value,
            NodeEdit::SetRiskLevel(value) => node.risk_level = value,
            NodeEdit::SetNotes(value) => node.notes = value,
            NodeEdit::SetDuration(value) => {
                if let Some(detail) = node.terminal_detail_mut() {
                    detail.duration = Some(value);
                    crew_hours::sync_terminal(detail);
                }
            }
            NodeEdit::SetHoursPerDay(value) => {
                if let Some(detail) = node.terminal_detail_mut() {
                    detail.hours_per_day = Some(value);
                    crew_hours::sync_terminal(detail);
                }
            }
            NodeEdit::SetResources(mut lines) => {
                if let Some(detail) = node.terminal_detail_mut() {
                    lines.iter_mut().for_each(ResourceLine::recalculate_total);
                    detail.resources = lines;
                }
            }
        }
        node
    }
}

pub fn update_field(nodes: Vec<CostNode>, id: &NodeId, edit: NodeEdit) -> Vec<CostNode> {
    find_and_apply(nodes, id, |node| edit.apply(node))
}

/// Appends `child` under `parent_id`, turning a terminal parent into a group.
/// The parent is expanded so the new child is visible.
pub fn add_child(nodes: Vec<CostNode>, parent_id: &NodeId, child: CostNode) -> Vec<CostNode> {
    find_and_apply(nodes, parent_id, |mut parent| {
        parent.kind = match parent.kind {
            NodeKind::Group { mut children } => {
                children.push(child);
                NodeKind::Group { children }
            }
            NodeKind::Terminal(_) => NodeKind::Group {
                children: vec![child],
            },
        };
        parent.expanded = true;
        parent
    })
}

pub fn add_root(mut nodes: Vec<CostNode>, node: CostNode) -> Vec<CostNode> {
    nodes.push(node);
    nodes
}

/// Removes the node and its whole subtree from every level.
pub fn delete_node(nodes: Vec<CostNode>, id: &NodeId) -> Vec<CostNode> {
    nodes
        .into_iter()
        .filter(|node| &node.id != id)
        .map(|mut node| {
            if let NodeKind::Group { children } = &mut node.kind {
                *children = delete_node(std::mem::take(children), id);
            }
            node
        })
        .collect()
}

pub fn toggle_expand(nodes: Vec<CostNode>, id: &NodeId) -> Vec<CostNode> {
    find_and_apply(nodes, id, |mut node| {
        node.expanded = !node.expanded;
        node
    })
}
