pub mod analysis;
pub mod assistant;
pub mod calculations;
pub mod catalog;
pub mod detail;
pub mod ingest;
pub mod metadata;
pub mod mutation;
pub mod node;
pub mod node_validation;
pub mod persistence;
pub mod resource;
pub mod settings;
pub mod view;
pub mod workspace;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use assistant::{AssistantError, EstimateAssistant, StaticAssistant};
pub use calculations::rollup::{grand_total, recalculate, recompute};
pub use catalog::{CatalogError, RateCatalog, RateEntry};
pub use detail::{DetailDraft, DetailUpdate, ResourceEdit};
pub use ingest::{IngestOutcome, IngestRejection, RawItemDescriptor};
pub use metadata::{EstimateMetadata, EstimateStatus};
pub use mutation::NodeEdit;
pub use node::{ContractType, CostCategory, CostNode, NodeId, NodeKind, RiskLevel, TerminalDetail};
pub use node_validation::ValidationError;
pub use resource::{ResourceId, ResourceLine};
pub use settings::{EstimateSettings, SettingsError};
pub use view::ViewMode;
pub use workspace::{EstimateWorkspace, IngestSummary, WorkspaceError};
