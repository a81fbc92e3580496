use crate::catalog::RateEntry;
use crate::node::CostCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single labor, equipment, material or subcontract cost component of a terminal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLine {
    pub id: ResourceId,
    pub description: String,
    pub category: CostCategory,
    /// Hours for labor/equipment, otherwise the line's own unit (CY, EA, ...).
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    /// Always `quantity * unit_price`.
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ResourceLine {
    pub fn new(
        category: CostCategory,
        description: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        unit_price: f64,
    ) -> Self {
        Self {
            id: ResourceId::generate(),
            description: description.into(),
            category,
            quantity,
            unit: unit.into(),
            unit_price,
            total: quantity * unit_price,
            notes: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn recalculate_total(&mut self) {
        self.total = self.quantity * self.unit_price;
    }

    /// Overwrite name, rate and unit from a rate catalog entry. Quantity is kept.
    pub fn apply_rate(&mut self, entry: &RateEntry) {
        self.description = entry.name.clone();
        self.unit_price = entry.rate;
        self.unit = entry.unit.clone();
        self.recalculate_total();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_a_rate_recomputes_total() {
        let mut line = ResourceLine::new(CostCategory::Labor, "", 16.0, "ea", 0.0);
        let entry = RateEntry::new("L-003", "Foreman", 85.0, "hr", CostCategory::Labor);
        line.apply_rate(&entry);
        assert_eq!(line.description, "Foreman");
        assert_eq!(line.unit, "hr");
        assert_eq!(line.unit_price, 85.0);
        assert_eq!(line.total, 1360.0);
    }
}
