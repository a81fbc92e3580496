//! The single authority over an estimate's canonical tree.
//!
//! Every change goes through a pure operator from [`crate::mutation`] and is
//! committed with a full recompute. The active [`ViewMode`] only changes what
//! [`EstimateWorkspace::display_items`] returns; structural edits are refused
//! while a derived view is active.

use crate::analysis::{self, CategoryShare, CostDriver};
use crate::assistant::{AssistantError, EstimateAssistant};
use crate::calculations::rollup::{grand_total, recalculate};
use crate::catalog::RateCatalog;
use crate::detail::{DetailDraft, DetailUpdate};
use crate::ingest::{self, RawItemDescriptor};
use crate::metadata::EstimateMetadata;
use crate::mutation::{self, NodeEdit};
use crate::node::{CostNode, NodeId};
use crate::node_validation::{ValidationError, validate_tree};
use crate::settings::EstimateSettings;
use crate::view::{self, ViewMode};
use polars::prelude::{DataFrame, PolarsResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("structure is read-only in the {mode} view")]
    StructuralEditRejected { mode: ViewMode },
    #[error("invalid edit: {0}")]
    Edit(#[from] ValidationError),
    #[error("no assistant is configured for this workspace")]
    AssistantUnavailable,
    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

/// Result of merging a generated batch into the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub added: Vec<NodeId>,
    pub rejected: Vec<String>,
}

pub struct EstimateWorkspace {
    metadata: EstimateMetadata,
    items: Vec<CostNode>,
    mode: ViewMode,
    selection: Option<NodeId>,
    catalog: RateCatalog,
    settings: EstimateSettings,
    assistant: Option<Box<dyn EstimateAssistant>>,
}

impl fmt::Debug for EstimateWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimateWorkspace")
            .field("metadata", &self.metadata)
            .field("items", &self.items.len())
            .field("mode", &self.mode)
            .field("selection", &self.selection)
            .field("assistant", &self.assistant.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for EstimateWorkspace {
    fn default() -> Self {
        Self::from_settings(EstimateSettings::default())
    }
}

impl EstimateWorkspace {
    pub fn new(metadata: EstimateMetadata, settings: EstimateSettings) -> Self {
        Self {
            metadata,
            items: Vec::new(),
            mode: ViewMode::Standard,
            selection: None,
            catalog: RateCatalog::standard(),
            settings,
            assistant: None,
        }
    }

    /// Empty estimate whose display currency comes from the settings.
    pub fn from_settings(settings: EstimateSettings) -> Self {
        let metadata = EstimateMetadata {
            currency: settings.currency.clone(),
            ..EstimateMetadata::default()
        };
        Self::new(metadata, settings)
    }

    /// Workspace over an existing tree. The tree is validated and recomputed.
    pub fn with_items(
        metadata: EstimateMetadata,
        items: Vec<CostNode>,
        settings: EstimateSettings,
    ) -> Result<Self, ValidationError> {
        validate_tree(&items)?;
        Ok(Self {
            items: recalculate(items),
            ..Self::new(metadata, settings)
        })
    }

    pub fn with_assistant(mut self, assistant: Box<dyn EstimateAssistant>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn set_assistant(&mut self, assistant: Box<dyn EstimateAssistant>) {
        self.assistant = Some(assistant);
    }

    pub fn metadata(&self) -> &EstimateMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, mut metadata: EstimateMetadata) {
        metadata.touch();
        self.metadata = metadata;
    }

    pub fn settings(&self) -> &EstimateSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &RateCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut RateCatalog {
        &mut self.catalog
    }

    /// Canonical tree.
    pub fn items(&self) -> &[CostNode] {
        &self.items
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.mode != mode {
            tracing::debug!(from = self.mode.as_str(), to = mode.as_str(), "view mode changed");
        }
        self.mode = mode;
    }

    /// Tree as shown in the active view mode.
    pub fn display_items(&self) -> Cow<'_, [CostNode]> {
        view::project(&self.items, self.mode)
    }

    pub fn grand_total(&self) -> f64 {
        grand_total(&self.items)
    }

    pub fn find(&self, id: &NodeId) -> Option<&CostNode> {
        mutation::find_node(&self.items, id)
    }

    pub fn selection(&self) -> Option<&NodeId> {
        self.selection.as_ref()
    }

    pub fn selected_node(&self) -> Option<&CostNode> {
        self.selection.as_ref().and_then(|id| self.find(id))
    }

    /// Replaces metadata and tree wholesale, e.g. after loading a snapshot.
    pub fn replace_estimate(
        &mut self,
        metadata: EstimateMetadata,
        items: Vec<CostNode>,
    ) -> Result<(), ValidationError> {
        validate_tree(&items)?;
        self.metadata = metadata;
        self.items = recalculate(items);
        self.selection = None;
        Ok(())
    }

    fn commit(&mut self, items: Vec<CostNode>) {
        self.items = recalculate(items);
        self.metadata.touch();
        let stale = self
            .selection
            .as_ref()
            .is_some_and(|id| !self.find(id).is_some_and(CostNode::is_terminal));
        if stale {
            tracing::debug!(selection = ?self.selection, "cleared stale selection");
            self.selection = None;
        }
    }

    fn ensure_structural(&self, operation: &str) -> Result<(), WorkspaceError> {
        if self.mode.is_derived() {
            tracing::warn!(operation, mode = self.mode.as_str(), "structural edit rejected");
            return Err(WorkspaceError::StructuralEditRejected { mode: self.mode });
        }
        Ok(())
    }

    /// Appends a new empty scope group at the root.
    pub fn add_root(&mut self) -> Result<NodeId, WorkspaceError> {
        self.ensure_structural("add_root")?;
        let node = CostNode::new_scope_item(self.settings.root_item_unit.clone());
        let id = node.id.clone();
        let items = mutation::add_root(std::mem::take(&mut self.items), node);
        self.commit(items);
        tracing::info!(%id, "added root item");
        Ok(id)
    }

    /// Appends a new sub-item under `parent`. `Ok(None)` if the parent does not exist.
    pub fn add_child(&mut self, parent: &NodeId) -> Result<Option<NodeId>, WorkspaceError> {
        self.ensure_structural("add_child")?;
        if self.find(parent).is_none() {
            return Ok(None);
        }
        let node = CostNode::new_sub_item(self.settings.child_item_unit.clone());
        let id = node.id.clone();
        let items = mutation::add_child(std::mem::take(&mut self.items), parent, node);
        self.commit(items);
        tracing::info!(%id, %parent, "added child item");
        Ok(Some(id))
    }

    /// Deletes a node and its subtree. `Ok(false)` if the id is unknown.
    pub fn delete(&mut self, id: &NodeId) -> Result<bool, WorkspaceError> {
        self.ensure_structural("delete")?;
        if self.find(id).is_none() {
            return Ok(false);
        }
        let items = mutation::delete_node(std::mem::take(&mut self.items), id);
        self.commit(items);
        tracing::info!(%id, "deleted item");
        Ok(true)
    }

    /// Applies one field edit by id.
    ///
    /// In a derived view only terminal nodes are reachable; an edit aimed at a
    /// canonical group there is treated like an unknown id. So is a
    /// terminal-only edit aimed at a group in any view.
    pub fn update_field(&mut self, id: &NodeId, edit: NodeEdit) -> Result<bool, WorkspaceError> {
        edit.validate()?;
        let group_only = self.mode.is_derived() || edit.is_terminal_only();
        let reachable = self
            .find(id)
            .is_some_and(|node| node.is_terminal() || !group_only);
        if !reachable {
            return Ok(false);
        }
        tracing::debug!(%id, field = edit.field_name(), "updating field");
        let items = mutation::update_field(std::mem::take(&mut self.items), id, edit);
        self.commit(items);
        Ok(true)
    }

    /// Flips the expansion hint. Derived views are always fully expanded, so
    /// this is a no-op there.
    pub fn toggle_expand(&mut self, id: &NodeId) -> bool {
        if self.mode.is_derived() || self.find(id).is_none() {
            return false;
        }
        self.items = mutation::toggle_expand(std::mem::take(&mut self.items), id);
        true
    }

    /// Opens a detail draft for a terminal node and selects it.
    pub fn open_detail(&mut self, id: &NodeId) -> Option<DetailDraft> {
        let draft = DetailDraft::open(self.find(id)?, &self.settings)?;
        self.selection = Some(id.clone());
        Some(draft)
    }

    pub fn close_detail(&mut self) {
        self.selection = None;
    }

    /// Composite save of a detail sheet. Allowed in every view mode.
    pub fn save_detail(&mut self, id: &NodeId, update: DetailUpdate) -> Result<bool, WorkspaceError> {
        update.validate()?;
        if !self.find(id).is_some_and(CostNode::is_terminal) {
            return Ok(false);
        }
        let items = mutation::find_and_apply(std::mem::take(&mut self.items), id, |node| {
            update.apply(node)
        });
        self.commit(items);
        tracing::info!(%id, "saved item detail");
        Ok(true)
    }

    pub fn save_draft(&mut self, draft: &mut DetailDraft) -> Result<bool, WorkspaceError> {
        let (id, update) = draft.to_update();
        self.save_detail(&id, update)
    }

    /// Appends a batch of generated descriptors at the root.
    pub fn ingest(
        &mut self,
        descriptors: Vec<RawItemDescriptor>,
    ) -> Result<IngestSummary, WorkspaceError> {
        self.ensure_structural("ingest")?;
        let outcome = ingest::ingest(descriptors);
        let summary = IngestSummary {
            added: outcome.nodes.iter().map(|node| node.id.clone()).collect(),
            rejected: outcome.rejected.iter().map(ToString::to_string).collect(),
        };
        if !outcome.nodes.is_empty() {
            let mut items = std::mem::take(&mut self.items);
            items.extend(outcome.nodes);
            self.commit(items);
        }
        Ok(summary)
    }

    /// Asks the assistant for items and ingests them.
    pub fn generate_items(&mut self, prompt: &str) -> Result<IngestSummary, WorkspaceError> {
        self.ensure_structural("generate_items")?;
        let assistant = self
            .assistant
            .as_ref()
            .ok_or(WorkspaceError::AssistantUnavailable)?;
        let descriptors = assistant.generate(prompt)?;
        self.ingest(descriptors)
    }

    pub fn analysis_payload(&self) -> String {
        analysis::analysis_payload(&self.items)
    }

    /// Narrative review of the canonical tree from the assistant.
    pub fn request_analysis(&self) -> Result<String, WorkspaceError> {
        let assistant = self
            .assistant
            .as_ref()
            .ok_or(WorkspaceError::AssistantUnavailable)?;
        Ok(assistant.summarize(&self.analysis_payload())?)
    }

    pub fn line_items_frame(&self) -> PolarsResult<DataFrame> {
        analysis::line_items_frame(&self.items)
    }

    pub fn category_breakdown(&self) -> PolarsResult<Vec<CategoryShare>> {
        analysis::category_breakdown(&self.items)
    }

    /// Top cost drivers, sized by `top_cost_items` in the settings.
    pub fn top_cost_items(&self) -> PolarsResult<Vec<CostDriver>> {
        analysis::top_cost_items(&self.items, self.settings.top_cost_items)
    }
}
