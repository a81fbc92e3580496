//! Read-only reports over the canonical tree: the narrative-analysis payload and
//! the cost breakdowns behind the dashboard.

use crate::node::{CostCategory, CostNode, NodeId};
use crate::view::flatten_terminals;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One line per node, depth first: `"{wbs} {description} - {total}"`.
pub fn summary_lines(nodes: &[CostNode]) -> Vec<String> {
    fn walk(nodes: &[CostNode], out: &mut Vec<String>) {
        for node in nodes {
            out.push(format!("{} {} - {}", node.wbs_code, node.description, node.total));
            if let Some(children) = node.children() {
                walk(children, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

/// Text handed to the external summariser.
pub fn analysis_payload(nodes: &[CostNode]) -> String {
    summary_lines(nodes).join("\n")
}

/// Terminal line items as a frame, in depth-first order.
pub fn line_items_frame(nodes: &[CostNode]) -> PolarsResult<DataFrame> {
    let items = flatten_terminals(nodes);

    let ids: Vec<&str> = items.iter().map(|n| n.id.as_str()).collect();
    let wbs: Vec<&str> = items.iter().map(|n| n.wbs_code.as_str()).collect();
    let descriptions: Vec<&str> = items.iter().map(|n| n.description.as_str()).collect();
    let categories: Vec<&str> = items.iter().map(|n| n.category.as_str()).collect();
    let contracts: Vec<Option<&str>> = items
        .iter()
        .map(|n| n.contract_type.map(|tag| tag.as_str()))
        .collect();
    let risks: Vec<Option<&str>> = items
        .iter()
        .map(|n| n.risk_level.map(|tag| tag.as_str()))
        .collect();
    let quantities: Vec<f64> = items.iter().map(|n| n.quantity).collect();
    let units: Vec<&str> = items.iter().map(|n| n.unit.as_str()).collect();
    let totals: Vec<f64> = items.iter().map(|n| n.total).collect();

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("wbs_code"), wbs).into_column(),
        Series::new(PlSmallStr::from_static("description"), descriptions).into_column(),
        Series::new(PlSmallStr::from_static("category"), categories).into_column(),
        Series::new(PlSmallStr::from_static("contract_type"), contracts).into_column(),
        Series::new(PlSmallStr::from_static("risk_level"), risks).into_column(),
        Series::new(PlSmallStr::from_static("quantity"), quantities).into_column(),
        Series::new(PlSmallStr::from_static("unit"), units).into_column(),
        Series::new(PlSmallStr::from_static("total"), totals).into_column(),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: CostCategory,
    pub total: f64,
    pub items: u32,
    /// Percent of the grand total; zero when the estimate is empty.
    pub share: f64,
}

/// Totals of terminal items per category, in order of first appearance.
pub fn category_breakdown(nodes: &[CostNode]) -> PolarsResult<Vec<CategoryShare>> {
    let frame = line_items_frame(nodes)?;
    if frame.height() == 0 {
        return Ok(Vec::new());
    }

    let grouped = frame
        .lazy()
        .group_by_stable([col("category")])
        .agg([
            col("total").sum().alias("total"),
            col("id").count().cast(DataType::UInt32).alias("items"),
        ])
        .collect()?;

    let categories = grouped.column("category")?.str()?;
    let totals = grouped.column("total")?.f64()?;
    let counts = grouped.column("items")?.u32()?;
    let grand: f64 = totals.into_iter().flatten().sum();

    let shares = categories
        .into_iter()
        .zip(totals.into_iter())
        .zip(counts.into_iter())
        .filter_map(|((category, total), items)| {
            let category = CostCategory::from_str(category?)?;
            let total = total.unwrap_or(0.0);
            Some(CategoryShare {
                category,
                total,
                items: items.unwrap_or(0),
                share: if grand > 0.0 { total / grand * 100.0 } else { 0.0 },
            })
        })
        .collect();
    Ok(shares)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDriver {
    pub id: NodeId,
    pub wbs_code: String,
    pub description: String,
    pub total: f64,
}

/// The `limit` most expensive terminal items. Ties keep tree order.
pub fn top_cost_items(nodes: &[CostNode], limit: usize) -> PolarsResult<Vec<CostDriver>> {
    let frame = line_items_frame(nodes)?;
    if frame.height() == 0 || limit == 0 {
        return Ok(Vec::new());
    }

    let top = frame
        .lazy()
        .sort(
            ["total"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(limit as IdxSize)
        .collect()?;

    let ids = top.column("id")?.str()?;
    let wbs = top.column("wbs_code")?.str()?;
    let descriptions = top.column("description")?.str()?;
    let totals = top.column("total")?.f64()?;

    let drivers = ids
        .into_iter()
        .zip(wbs.into_iter())
        .zip(descriptions.into_iter())
        .zip(totals.into_iter())
        .map(|(((id, wbs_code), description), total)| CostDriver {
            id: NodeId::new(id.unwrap_or_default()),
            wbs_code: wbs_code.unwrap_or_default().to_string(),
            description: description.unwrap_or_default().to_string(),
            total: total.unwrap_or(0.0),
        })
        .collect();
    Ok(drivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::rollup::recalculate;

    fn sample() -> Vec<CostNode> {
        recalculate(vec![
            CostNode::group("General Conditions", CostCategory::Indirect)
                .with_id("101")
                .with_children(vec![
                    CostNode::terminal("Supervision", 1.0, "ls", 5000.0, CostCategory::Labor)
                        .with_id("102"),
                    CostNode::terminal("Trailer", 1.0, "ls", 10000.0, CostCategory::Equipment)
                        .with_id("103"),
                ]),
            CostNode::group("Site Work", CostCategory::Indirect)
                .with_id("201")
                .with_children(vec![
                    CostNode::terminal("Excavation", 500.0, "cy", 25.0, CostCategory::Equipment)
                        .with_id("202"),
                ]),
        ])
    }

    #[test]
    fn summary_lists_every_node_depth_first() {
        let lines = summary_lines(&sample());
        assert_eq!(
            lines,
            vec![
                "1 General Conditions - 15000",
                "1.1 Supervision - 5000",
                "1.2 Trailer - 10000",
                "2 Site Work - 12500",
                "2.1 Excavation - 12500",
            ]
        );
        assert_eq!(analysis_payload(&[]), "");
    }

    #[test]
    fn frame_holds_only_terminal_items() {
        let frame = line_items_frame(&sample()).unwrap();
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.width(), 9);
    }

    #[test]
    fn breakdown_groups_by_category() {
        let shares = category_breakdown(&sample()).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category, CostCategory::Labor);
        assert_eq!(shares[0].total, 5000.0);
        assert_eq!(shares[1].category, CostCategory::Equipment);
        assert_eq!(shares[1].total, 22500.0);
        assert_eq!(shares[1].items, 2);
        let sum: f64 = shares.iter().map(|s| s.share).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn top_items_sorted_by_total() {
        let top = top_cost_items(&sample(), 2).unwrap();
        let ids: Vec<&str> = top.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["202", "103"]);
        assert_eq!(top[0].wbs_code, "2.1");
    }

    #[test]
    fn empty_tree_has_no_breakdown() {
        assert!(category_breakdown(&[]).unwrap().is_empty());
        assert!(top_cost_items(&[], 5).unwrap().is_empty());
    }
}
