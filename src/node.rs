use crate::resource::ResourceLine;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable handle for a cost node. Survives recomputation and view projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a node created by a mutation or by ingestion.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostCategory {
    Labor,
    Material,
    Equipment,
    Subcontractor,
    Indirect,
}

impl CostCategory {
    pub const ALL: [CostCategory; 5] = [
        CostCategory::Labor,
        CostCategory::Material,
        CostCategory::Equipment,
        CostCategory::Subcontractor,
        CostCategory::Indirect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Labor => "Labor",
            CostCategory::Material => "Material",
            CostCategory::Equipment => "Equipment",
            CostCategory::Subcontractor => "Subcontractor",
            CostCategory::Indirect => "Indirect",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value))
    }

    /// Labor and equipment lines are priced per crew hour and follow the node's schedule.
    pub fn follows_crew_hours(&self) -> bool {
        matches!(self, CostCategory::Labor | CostCategory::Equipment)
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "Lump Sum")]
    LumpSum,
    #[serde(rename = "Unit Price")]
    UnitPrice,
    #[serde(rename = "Time & Material", alias = "T&M")]
    TimeAndMaterial,
    #[serde(rename = "Cost Plus")]
    CostPlus,
}

impl ContractType {
    pub const ALL: [ContractType; 4] = [
        ContractType::LumpSum,
        ContractType::UnitPrice,
        ContractType::TimeAndMaterial,
        ContractType::CostPlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::LumpSum => "Lump Sum",
            ContractType::UnitPrice => "Unit Price",
            ContractType::TimeAndMaterial => "Time & Material",
            ContractType::CostPlus => "Cost Plus",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "lump sum" | "lumpsum" => Some(ContractType::LumpSum),
            "unit price" | "unitprice" => Some(ContractType::UnitPrice),
            "time & material" | "t&m" | "time and material" => Some(ContractType::TimeAndMaterial),
            "cost plus" | "costplus" => Some(ContractType::CostPlus),
            _ => None,
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Costing inputs that only exist on terminal nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalDetail {
    /// Detailed breakdown. When non-empty it replaces the quantity x unit price plug.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceLine>,
    /// Working days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Shift length in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<f64>,
}

impl TerminalDetail {
    pub fn is_detailed(&self) -> bool {
        !self.resources.is_empty()
    }

    /// Own cost of a terminal node: sum of resource lines, else the plug value.
    pub fn cost(&self, quantity: f64, unit_price: f64) -> f64 {
        if self.is_detailed() {
            self.resources.iter().map(|r| r.total).sum()
        } else {
            quantity * unit_price
        }
    }
}

/// Group or terminal. A group with an empty child list is still a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Group { children: Vec<CostNode> },
    Terminal(TerminalDetail),
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Terminal(TerminalDetail::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostNode {
    pub id: NodeId,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    /// Plug price, only used while the node has no resource breakdown.
    pub unit_price: f64,
    pub category: CostCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<ContractType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Derived from position by the rollup pass.
    #[serde(default)]
    pub wbs_code: String,
    /// Derived by the rollup pass.
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub expanded: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl CostNode {
    pub fn terminal(
        description: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        unit_price: f64,
        category: CostCategory,
    ) -> Self {
        Self {
            id: NodeId::generate(),
            description: description.into(),
            quantity,
            unit: unit.into(),
            unit_price,
            category,
            contract_type: None,
            risk_level: None,
            notes: None,
            wbs_code: String::new(),
            total: 0.0,
            expanded: false,
            kind: NodeKind::Terminal(TerminalDetail::default()),
        }
    }

    pub fn group(description: impl Into<String>, category: CostCategory) -> Self {
        Self {
            quantity: 1.0,
            expanded: true,
            kind: NodeKind::Group {
                children: Vec::new(),
            },
            ..Self::terminal(description, 1.0, "ls", 0.0, category)
        }
    }

    /// Default phase appended at the root of an estimate.
    pub fn new_scope_item(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::group("New Scope Item", CostCategory::Material)
        }
    }

    /// Default terminal item appended under an existing node.
    pub fn new_sub_item(unit: impl Into<String>) -> Self {
        Self {
            expanded: true,
            ..Self::terminal("New Sub-Item", 1.0, unit, 0.0, CostCategory::Material)
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_children(mut self, children: Vec<CostNode>) -> Self {
        self.kind = NodeKind::Group { children };
        self
    }

    pub fn with_resources(mut self, resources: Vec<ResourceLine>) -> Self {
        self.edit_terminal_detail(|detail| detail.resources = resources);
        self
    }

    pub fn with_schedule(mut self, duration: f64, hours_per_day: f64) -> Self {
        self.edit_terminal_detail(|detail| {
            detail.duration = Some(duration);
            detail.hours_per_day = Some(hours_per_day);
        });
        self
    }

    pub fn with_contract_type(mut self, contract_type: ContractType) -> Self {
        self.contract_type = Some(contract_type);
        self
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = Some(risk_level);
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_group()
    }

    pub fn children(&self) -> Option<&[CostNode]> {
        match &self.kind {
            NodeKind::Group { children } => Some(children),
            NodeKind::Terminal(_) => None,
        }
    }

    pub fn terminal_detail(&self) -> Option<&TerminalDetail> {
        match &self.kind {
            NodeKind::Terminal(detail) => Some(detail),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn terminal_detail_mut(&mut self) -> Option<&mut TerminalDetail> {
        match &mut self.kind {
            NodeKind::Terminal(detail) => Some(detail),
            NodeKind::Group { .. } => None,
        }
    }

    /// Resource lines of a terminal node; empty for groups.
    pub fn resources(&self) -> &[ResourceLine] {
        self.terminal_detail()
            .map(|detail| detail.resources.as_slice())
            .unwrap_or(&[])
    }

    /// True if `id` names this node or any node below it.
    pub fn subtree_contains(&self, id: &NodeId) -> bool {
        if &self.id == id {
            return true;
        }
        self.children()
            .map(|children| children.iter().any(|child| child.subtree_contains(id)))
            .unwrap_or(false)
    }

    /// Runs `edit` on the terminal detail, turning a group into a terminal first.
    fn edit_terminal_detail(&mut self, edit: impl FnOnce(&mut TerminalDetail)) {
        let mut detail = match std::mem::take(&mut self.kind) {
            NodeKind::Terminal(detail) => detail,
            NodeKind::Group { .. } => TerminalDetail::default(),
        };
        edit(&mut detail);
        self.kind = NodeKind::Terminal(detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(CostCategory::from_str("labor"), Some(CostCategory::Labor));
        assert_eq!(
            CostCategory::from_str(" Subcontractor "),
            Some(CostCategory::Subcontractor)
        );
        assert_eq!(CostCategory::from_str("Overhead"), None);
    }

    #[test]
    fn contract_type_accepts_short_form() {
        assert_eq!(
            ContractType::from_str("T&M"),
            Some(ContractType::TimeAndMaterial)
        );
        assert_eq!(
            ContractType::from_str("lump_sum"),
            Some(ContractType::LumpSum)
        );
        let parsed: ContractType = serde_json::from_str("\"T&M\"").unwrap();
        assert_eq!(parsed, ContractType::TimeAndMaterial);
    }

    #[test]
    fn empty_group_is_still_a_group() {
        let node = CostNode::group("Phase", CostCategory::Indirect);
        assert!(node.is_group());
        assert_eq!(node.children().map(|c| c.len()), Some(0));
        assert!(node.resources().is_empty());
    }

    #[test]
    fn schedule_builder_turns_group_into_terminal() {
        let node = CostNode::group("Phase", CostCategory::Indirect)
            .with_children(vec![CostNode::terminal("Leaf", 1.0, "ea", 1.0, CostCategory::Labor)])
            .with_schedule(3.0, 10.0);
        assert!(node.is_terminal());
        let detail = node.terminal_detail().unwrap();
        assert_eq!(detail.duration, Some(3.0));
        assert_eq!(detail.hours_per_day, Some(10.0));
    }

    #[test]
    fn node_json_carries_kind_tag() {
        let node = CostNode::terminal("Excavation", 500.0, "cy", 25.0, CostCategory::Equipment)
            .with_id("201");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "terminal");
        assert_eq!(json["id"], "201");

        let back: CostNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn subtree_contains_finds_descendants() {
        let leaf = CostNode::terminal("Leaf", 1.0, "ea", 1.0, CostCategory::Material).with_id("l");
        let group = CostNode::group("G", CostCategory::Indirect)
            .with_id("g")
            .with_children(vec![leaf]);
        assert!(group.subtree_contains(&NodeId::from("l")));
        assert!(!group.subtree_contains(&NodeId::from("x")));
    }
}
