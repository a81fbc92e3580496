use crate::node::CostCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("rate entry {0} already exists")]
    DuplicateId(String),
    #[error("rate entry {id} has invalid rate {rate}")]
    InvalidRate { id: String, rate: f64 },
    #[error("rate catalog only holds labor and equipment rates (got {0})")]
    UnsupportedCategory(CostCategory),
}

/// One priced labor or equipment rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub id: String,
    pub name: String,
    /// Price per `unit`, usually hourly.
    pub rate: f64,
    pub unit: String,
    pub category: CostCategory,
}

impl RateEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rate: f64,
        unit: impl Into<String>,
        category: CostCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rate,
            unit: unit.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCatalog {
    entries: Vec<RateEntry>,
}

impl Default for RateCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl RateCatalog {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Seeded hourly rates for common crafts and equipment.
    pub fn standard() -> Self {
        const LABOR: [(&str, &str, f64); 10] = [
            ("L-001", "General Laborer", 35.0),
            ("L-002", "Skilled Laborer", 45.0),
            ("L-003", "Foreman", 85.0),
            ("L-004", "Superintendent", 110.0),
            ("L-005", "Carpenter", 65.0),
            ("L-006", "Electrician", 75.0),
            ("L-007", "Plumber", 72.0),
            ("L-008", "Operator - Light", 55.0),
            ("L-009", "Operator - Heavy", 78.0),
            ("L-010", "Ironworker", 82.0),
        ];
        const EQUIPMENT: [(&str, &str, f64); 10] = [
            ("E-001", "Excavator (20T)", 185.0),
            ("E-002", "Excavator (Mini)", 95.0),
            ("E-003", "Skid Steer Loader", 85.0),
            ("E-004", "Dozer (D6)", 220.0),
            ("E-005", "Dump Truck (12cy)", 110.0),
            ("E-006", "Compactor (Roller)", 75.0),
            ("E-007", "Telehandler", 105.0),
            ("E-008", "Scissor Lift", 45.0),
            ("E-009", "Generator (50kW)", 60.0),
            ("E-010", "Concrete Pump", 250.0),
        ];

        let labor = LABOR
            .iter()
            .map(|(id, name, rate)| RateEntry::new(*id, *name, *rate, "hr", CostCategory::Labor));
        let equipment = EQUIPMENT.iter().map(|(id, name, rate)| {
            RateEntry::new(*id, *name, *rate, "hr", CostCategory::Equipment)
        });
        Self {
            entries: labor.chain(equipment).collect(),
        }
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&RateEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn by_category(&self, category: CostCategory) -> impl Iterator<Item = &RateEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.category == category)
    }

    pub fn first_for(&self, category: CostCategory) -> Option<&RateEntry> {
        self.by_category(category).next()
    }

    /// Case-insensitive name search within one category.
    pub fn search(&self, category: CostCategory, term: &str) -> Vec<&RateEntry> {
        let needle = term.trim().to_lowercase();
        self.by_category(category)
            .filter(|entry| needle.is_empty() || entry.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn add(&mut self, entry: RateEntry) -> Result<(), CatalogError> {
        if !entry.category.follows_crew_hours() {
            return Err(CatalogError::UnsupportedCategory(entry.category));
        }
        if !entry.rate.is_finite() || entry.rate < 0.0 {
            return Err(CatalogError::InvalidRate {
                id: entry.id,
                rate: entry.rate,
            });
        }
        if self.get(&entry.id).is_some() {
            return Err(CatalogError::DuplicateId(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Next free id in the `L-###` / `E-###` sequence of a category.
    pub fn next_id(&self, category: CostCategory) -> String {
        let prefix = match category {
            CostCategory::Equipment => "E",
            _ => "L",
        };
        let next = self
            .by_category(category)
            .filter_map(|entry| entry.id.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u32>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(1);
        format!("{prefix}-{next:03}")
    }
}
