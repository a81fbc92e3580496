use super::{EstimateStore, PersistenceError, PersistenceResult};
use crate::metadata::EstimateMetadata;
use crate::node::CostNode;
use crate::node_validation::validate_tree;
use crate::view::flatten_terminals;
use crate::EstimateWorkspace;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const SNAPSHOT_VERSION: u32 = 1;

fn snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Serialize, Deserialize)]
struct EstimateSnapshot {
    #[serde(default = "snapshot_version")]
    version: u32,
    metadata: EstimateMetadata,
    items: Vec<CostNode>,
}

impl EstimateSnapshot {
    fn from_workspace(workspace: &EstimateWorkspace) -> PersistenceResult<Self> {
        validate_tree(workspace.items())?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            metadata: workspace.metadata().clone(),
            items: workspace.items().to_vec(),
        })
    }

    fn restore_into(self, workspace: &mut EstimateWorkspace) -> PersistenceResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::InvalidData(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        // Stored totals and WBS codes are discarded and derived again.
        workspace.replace_estimate(self.metadata, self.items)?;
        Ok(())
    }
}

pub fn save_estimate_to_json<P: AsRef<Path>>(
    workspace: &EstimateWorkspace,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = EstimateSnapshot::from_workspace(workspace)?;
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    tracing::info!(path = %path.as_ref().display(), "saved estimate");
    Ok(())
}

/// Loads a snapshot into `workspace`, keeping its settings, catalog and view mode.
pub fn load_estimate_from_json<P: AsRef<Path>>(
    workspace: &mut EstimateWorkspace,
    path: P,
) -> PersistenceResult<()> {
    let file = File::open(path.as_ref())?;
    let snapshot: EstimateSnapshot = serde_json::from_reader(file)?;
    snapshot.restore_into(workspace)?;
    tracing::info!(
        path = %path.as_ref().display(),
        items = workspace.items().len(),
        "loaded estimate"
    );
    Ok(())
}

/// JSON snapshot kept at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EstimateStore for JsonFileStore {
    fn save_estimate(&self, workspace: &EstimateWorkspace) -> PersistenceResult<()> {
        save_estimate_to_json(workspace, &self.path)
    }

    fn load_estimate(&self, workspace: &mut EstimateWorkspace) -> PersistenceResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        load_estimate_from_json(workspace, &self.path)?;
        Ok(true)
    }
}

#[derive(Serialize)]
struct LineItemCsvRecord<'a> {
    wbs_code: &'a str,
    id: &'a str,
    description: &'a str,
    category: &'a str,
    contract_type: &'a str,
    risk_level: &'a str,
    quantity: f64,
    unit: &'a str,
    unit_price: f64,
    resources: usize,
    duration: String,
    hours_per_day: String,
    total: f64,
}

impl<'a> From<&'a CostNode> for LineItemCsvRecord<'a> {
    fn from(node: &'a CostNode) -> Self {
        let detail = node.terminal_detail();
        Self {
            wbs_code: &node.wbs_code,
            id: node.id.as_str(),
            description: &node.description,
            category: node.category.as_str(),
            contract_type: node.contract_type.map(|tag| tag.as_str()).unwrap_or(""),
            risk_level: node.risk_level.map(|tag| tag.as_str()).unwrap_or(""),
            quantity: node.quantity,
            unit: &node.unit,
            unit_price: node.unit_price,
            resources: node.resources().len(),
            duration: format_option_f64(detail.and_then(|d| d.duration)),
            hours_per_day: format_option_f64(detail.and_then(|d| d.hours_per_day)),
            total: node.total,
        }
    }
}

fn format_option_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes terminal line items, depth first, as CSV.
pub fn write_line_items_csv<W: Write>(nodes: &[CostNode], writer: W) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for node in flatten_terminals(nodes) {
        writer.serialize(LineItemCsvRecord::from(node))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_line_items_to_csv<P: AsRef<Path>>(
    workspace: &EstimateWorkspace,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    write_line_items_csv(workspace.items(), file)?;
    tracing::info!(path = %path.as_ref().display(), "exported line items");
    Ok(())
}
