//! Editing session for one terminal node.
//!
//! A [`DetailDraft`] holds a private copy of a node's resources, schedule and
//! tags. Nothing reaches the canonical tree until the draft is turned into a
//! [`DetailUpdate`] and saved through the workspace in a single mutation.

use crate::calculations::crew_hours;
use crate::catalog::RateCatalog;
use crate::node::{ContractType, CostCategory, CostNode, NodeId, RiskLevel};
use crate::node_validation::{ValidationError, validate_amount};
use crate::resource::{ResourceId, ResourceLine};
use crate::settings::EstimateSettings;
use serde::{Deserialize, Serialize};

/// Typed edit of a single resource line field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ResourceEdit {
    Description(String),
    Category(CostCategory),
    Quantity(f64),
    Unit(String),
    UnitPrice(f64),
    Notes(Option<String>),
}

impl ResourceEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ResourceEdit::Quantity(value) => validate_amount("resource quantity", *value),
            ResourceEdit::UnitPrice(value) => validate_amount("resource unit_price", *value),
            _ => Ok(()),
        }
    }

    fn apply(self, line: &mut ResourceLine) {
        match self {
            ResourceEdit::Description(value) => line.description = value,
            ResourceEdit::Category(value) => line.category = value,
            ResourceEdit::Quantity(value) => line.quantity = value,
            ResourceEdit::Unit(value) => line.unit = value,
            ResourceEdit::UnitPrice(value) => line.unit_price = value,
            ResourceEdit::Notes(value) => line.notes = value,
        }
        line.recalculate_total();
    }
}

/// Everything a detail save writes back to a terminal node in one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailUpdate {
    pub resources: Vec<ResourceLine>,
    pub duration: f64,
    pub hours_per_day: f64,
    pub quantity: f64,
    #[serde(default)]
    pub contract_type: Option<ContractType>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
}

impl DetailUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_amount("duration", self.duration)?;
        validate_amount("hours_per_day", self.hours_per_day)?;
        validate_amount("quantity", self.quantity)?;
        for line in &self.resources {
            validate_amount("resource quantity", line.quantity)?;
            validate_amount("resource unit_price", line.unit_price)?;
        }
        Ok(())
    }

    /// Writes the update into a terminal node. Crew lines are re-synced only
    /// when the schedule differs from the stored one, so hand-set quantities
    /// survive a save. Groups come back unchanged.
    pub fn apply(self, mut node: CostNode) -> CostNode {
        let Some(detail) = node.terminal_detail_mut() else {
            return node;
        };
        let rescheduled = detail.duration != Some(self.duration)
            || detail.hours_per_day != Some(self.hours_per_day);
        detail.resources = self.resources;
        detail.duration = Some(self.duration);
        detail.hours_per_day = Some(self.hours_per_day);
        if rescheduled {
            crew_hours::sync_terminal(detail);
        }
        detail.resources.iter_mut().for_each(ResourceLine::recalculate_total);

        node.quantity = self.quantity;
        node.contract_type = self.contract_type;
        node.risk_level = self.risk_level;
        node
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailDraft {
    node_id: NodeId,
    resources: Vec<ResourceLine>,
    quantity: f64,
    duration: f64,
    hours_per_day: f64,
    contract_type: ContractType,
    risk_level: RiskLevel,
    dirty: bool,
}

impl DetailDraft {
    /// Opens a draft for a terminal node. Zero or missing values fall back to
    /// the settings defaults. Returns `None` for groups.
    pub fn open(node: &CostNode, settings: &EstimateSettings) -> Option<Self> {
        let detail = node.terminal_detail()?;
        let positive_or = |value: Option<f64>, fallback: f64| {
            value.filter(|v| *v > 0.0).unwrap_or(fallback)
        };
        let mut draft = Self {
            node_id: node.id.clone(),
            resources: detail.resources.clone(),
            quantity: positive_or(Some(node.quantity), 1.0),
            duration: positive_or(detail.duration, settings.default_duration_days),
            hours_per_day: positive_or(detail.hours_per_day, settings.default_hours_per_day),
            contract_type: node.contract_type.unwrap_or(ContractType::LumpSum),
            risk_level: node.risk_level.unwrap_or(RiskLevel::Low),
            dirty: false,
        };
        draft.dirty = draft.sync() > 0;
        Some(draft)
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn resources(&self) -> &[ResourceLine] {
        &self.resources
    }

    pub fn resources_in(&self, category: CostCategory) -> impl Iterator<Item = &ResourceLine> {
        self.resources
            .iter()
            .filter(move |line| line.category == category)
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    pub fn contract_type(&self) -> ContractType {
        self.contract_type
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn crew_hours(&self) -> f64 {
        crew_hours::crew_hours(self.duration, self.hours_per_day)
    }

    pub fn daily_output(&self) -> f64 {
        crew_hours::daily_output(self.quantity, self.duration)
    }

    /// Sum of the draft's resource lines.
    pub fn total(&self) -> f64 {
        self.resources.iter().map(|line| line.total).sum()
    }

    fn sync(&mut self) -> usize {
        let hours = self.crew_hours();
        crew_hours::sync_resources(&mut self.resources, hours)
    }

    pub fn set_quantity(&mut self, quantity: f64) -> Result<(), ValidationError> {
        validate_amount("quantity", quantity)?;
        self.quantity = quantity;
        self.dirty = true;
        Ok(())
    }

    pub fn set_duration(&mut self, duration: f64) -> Result<(), ValidationError> {
        validate_amount("duration", duration)?;
        self.duration = duration;
        self.sync();
        self.dirty = true;
        Ok(())
    }

    pub fn set_hours_per_day(&mut self, hours_per_day: f64) -> Result<(), ValidationError> {
        validate_amount("hours_per_day", hours_per_day)?;
        self.hours_per_day = hours_per_day;
        self.sync();
        self.dirty = true;
        Ok(())
    }

    pub fn set_contract_type(&mut self, contract_type: ContractType) {
        self.contract_type = contract_type;
        self.dirty = true;
    }

    pub fn set_risk_level(&mut self, risk_level: RiskLevel) {
        self.risk_level = risk_level;
        self.dirty = true;
    }

    /// Appends a line for `category`. Crew lines start at the current crew
    /// hours priced from the first catalog rate of that category.
    pub fn add_resource(&mut self, category: CostCategory, catalog: &RateCatalog) -> ResourceId {
        let line = if category.follows_crew_hours() {
            let (name, rate) = catalog
                .first_for(category)
                .map(|entry| (entry.name.clone(), entry.rate))
                .unwrap_or_default();
            ResourceLine::new(category, name, self.crew_hours(), "hr", rate)
        } else {
            ResourceLine::new(category, "", 1.0, "ea", 0.0)
        };
        let id = line.id.clone();
        self.resources.push(line);
        self.dirty = true;
        id
    }

    /// Returns `Ok(false)` when no line has this id.
    pub fn update_resource(
        &mut self,
        id: &ResourceId,
        edit: ResourceEdit,
    ) -> Result<bool, ValidationError> {
        edit.validate()?;
        let Some(line) = self.resources.iter_mut().find(|line| &line.id == id) else {
            return Ok(false);
        };
        edit.apply(line);
        self.dirty = true;
        Ok(true)
    }

    /// Prices a line from a catalog entry. False if either id is unknown.
    pub fn select_from_catalog(
        &mut self,
        id: &ResourceId,
        catalog: &RateCatalog,
        entry_id: &str,
    ) -> bool {
        let Some(entry) = catalog.get(entry_id) else {
            return false;
        };
        let Some(line) = self.resources.iter_mut().find(|line| &line.id == id) else {
            return false;
        };
        line.apply_rate(entry);
        self.dirty = true;
        true
    }

    pub fn delete_resource(&mut self, id: &ResourceId) -> bool {
        let before = self.resources.len();
        self.resources.retain(|line| &line.id != id);
        let removed = self.resources.len() != before;
        self.dirty |= removed;
        removed
    }

    /// Snapshot of the draft for a composite save. The draft stays open and clean.
    pub fn to_update(&mut self) -> (NodeId, DetailUpdate) {
        self.dirty = false;
        (
            self.node_id.clone(),
            DetailUpdate {
                resources: self.resources.clone(),
                duration: self.duration,
                hours_per_day: self.hours_per_day,
                quantity: self.quantity,
                contract_type: Some(self.contract_type),
                risk_level: Some(self.risk_level),
            },
        )
    }
}
