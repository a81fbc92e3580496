//! Bottom-up totals and top-down WBS numbering in a single pass.
//!
//! Every mutation of the canonical tree is followed by [`recompute`]; WBS codes
//! and totals are never trusted from a previous pass.

use crate::node::{CostNode, NodeKind};

/// WBS code of the sibling at `index` (0-based) under `parent_prefix`.
pub fn wbs_code(parent_prefix: &str, index: usize) -> String {
    if parent_prefix.is_empty() {
        (index + 1).to_string()
    } else {
        format!("{parent_prefix}.{}", index + 1)
    }
}

/// Renumbers and re-totals a sibling sequence, returning it with the branch subtotal.
pub fn recompute(nodes: Vec<CostNode>, parent_prefix: &str) -> (Vec<CostNode>, f64) {
    let mut branch_total = 0.0;
    let mut updated = Vec::with_capacity(nodes.len());

    for (index, mut node) in nodes.into_iter().enumerate() {
        node.wbs_code = wbs_code(parent_prefix, index);
        node.total = match &mut node.kind {
            NodeKind::Group { children } => {
                let (children_updated, subtotal) =
                    recompute(std::mem::take(children), &node.wbs_code);
                *children = children_updated;
                subtotal
            }
            NodeKind::Terminal(detail) => {
                for line in &mut detail.resources {
                    line.recalculate_total();
                }
                detail.cost(node.quantity, node.unit_price)
            }
        };
        branch_total += node.total;
        updated.push(node);
    }

    (updated, branch_total)
}

/// Recomputes a whole canonical tree from the root.
pub fn recalculate(nodes: Vec<CostNode>) -> Vec<CostNode> {
    let (nodes, total) = recompute(nodes, "");
    tracing::debug!(roots = nodes.len(), total, "recomputed cost tree");
    nodes
}

/// Sum of root totals. Only meaningful on a recomputed tree.
pub fn grand_total(nodes: &[CostNode]) -> f64 {
    nodes.iter().map(|node| node.total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CostCategory;
    use crate::resource::ResourceLine;

    fn leaf(id: &str, qty: f64, price: f64) -> CostNode {
        CostNode::terminal(id, qty, "ea", price, CostCategory::Material).with_id(id)
    }

    #[test]
    fn wbs_codes_follow_position() {
        assert_eq!(wbs_code("", 0), "1");
        assert_eq!(wbs_code("2", 2), "2.3");
        assert_eq!(wbs_code("1.4", 0), "1.4.1");
    }

    #[test]
    fn detailed_terminal_ignores_plug_price() {
        let node = leaf("a", 10.0, 100.0).with_resources(vec![
            ResourceLine::new(CostCategory::Labor, "Crew", 8.0, "hr", 50.0),
            ResourceLine::new(CostCategory::Material, "Rebar", 2.0, "ton", 900.0),
        ]);
        let (nodes, total) = recompute(vec![node], "");
        assert_eq!(total, 2200.0);
        assert_eq!(nodes[0].total, 2200.0);
    }

    #[test]
    fn resource_totals_are_refreshed() {
        let mut line = ResourceLine::new(CostCategory::Labor, "Crew", 8.0, "hr", 50.0);
        line.total = 1.0;
        let (nodes, _) = recompute(vec![leaf("a", 1.0, 1.0).with_resources(vec![line])], "");
        assert_eq!(nodes[0].resources()[0].total, 400.0);
    }

    #[test]
    fn empty_group_totals_zero() {
        let group = CostNode::group("Empty", CostCategory::Indirect).with_id("g");
        let (nodes, total) = recompute(vec![group, leaf("b", 2.0, 3.0)], "");
        assert_eq!(nodes[0].total, 0.0);
        assert_eq!(nodes[1].wbs_code, "2");
        assert_eq!(total, 6.0);
    }

    #[test]
    fn stale_codes_are_overwritten() {
        let mut a = leaf("a", 1.0, 1.0);
        a.wbs_code = "9.9".to_string();
        let (nodes, _) = recompute(vec![a], "3");
        assert_eq!(nodes[0].wbs_code, "3.1");
    }
}
