use crate::node::{CostNode, NodeId, NodeKind};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),
    #[error("node {id}: {source}")]
    InNode {
        id: NodeId,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Zero is allowed everywhere; NaN, infinities and negatives are not.
pub fn validate_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue { field, value })
    }
}

pub fn validate_node(node: &CostNode) -> Result<(), ValidationError> {
    let in_node = |err: ValidationError| ValidationError::InNode {
        id: node.id.clone(),
        source: Box::new(err),
    };
    validate_amount("quantity", node.quantity).map_err(in_node)?;
    validate_amount("unit_price", node.unit_price).map_err(in_node)?;
    if let NodeKind::Terminal(detail) = &node.kind {
        if let Some(duration) = detail.duration {
            validate_amount("duration", duration).map_err(in_node)?;
        }
        if let Some(hours) = detail.hours_per_day {
            validate_amount("hours_per_day", hours).map_err(in_node)?;
        }
        for line in &detail.resources {
            validate_amount("resource quantity", line.quantity).map_err(in_node)?;
            validate_amount("resource unit_price", line.unit_price).map_err(in_node)?;
        }
    }
    Ok(())
}

/// Checks every node in the tree and that ids are globally unique.
pub fn validate_tree(nodes: &[CostNode]) -> Result<(), ValidationError> {
    fn walk<'a>(
        nodes: &'a [CostNode],
        seen: &mut HashSet<&'a NodeId>,
    ) -> Result<(), ValidationError> {
        for node in nodes {
            if !seen.insert(&node.id) {
                return Err(ValidationError::DuplicateId(node.id.clone()));
            }
            validate_node(node)?;
            if let Some(children) = node.children() {
                walk(children, seen)?;
            }
        }
        Ok(())
    }

    let mut seen = HashSet::new();
    walk(nodes, &mut seen)
}
