use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    CostNode, DetailUpdate, EstimateMetadata, EstimateStatus, EstimateWorkspace, IngestSummary,
    NodeEdit, NodeId, RawItemDescriptor, ViewMode, WorkspaceError,
    analysis::{CategoryShare, CostDriver},
};

#[derive(Clone)]
pub struct AppState {
    workspace: Arc<RwLock<EstimateWorkspace>>,
}

impl AppState {
    pub fn new(workspace: EstimateWorkspace) -> Self {
        Self {
            workspace: Arc::new(RwLock::new(workspace)),
        }
    }

    pub fn with_shared(workspace: Arc<RwLock<EstimateWorkspace>>) -> Self {
        Self { workspace }
    }

    fn workspace(&self) -> Arc<RwLock<EstimateWorkspace>> {
        self.workspace.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    fn item_not_found(id: &NodeId) -> Self {
        Self::not_found(format!("item {id} not found"))
    }
}

impl From<WorkspaceError> for ApiError {
    fn from(value: WorkspaceError) -> Self {
        match value {
            WorkspaceError::StructuralEditRejected { .. } => ApiError::Conflict(value.to_string()),
            WorkspaceError::Edit(_) => ApiError::Invalid(value.to_string()),
            WorkspaceError::AssistantUnavailable => ApiError::Conflict(value.to_string()),
            WorkspaceError::Assistant(_) => ApiError::Internal(value.to_string()),
        }
    }
}

impl From<polars::prelude::PolarsError> for ApiError {
    fn from(value: polars::prelude::PolarsError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ItemsQuery {
    mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub mode: ViewMode,
    pub total: f64,
    pub items: Vec<CostNode>,
}

#[derive(Debug, Deserialize)]
struct MetadataPayload {
    project_name: String,
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    status: Option<EstimateStatus>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModePayload {
    pub mode: ViewMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub lines: Vec<String>,
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownResponse {
    pub total: f64,
    pub currency: String,
    pub categories: Vec<CategoryShare>,
    pub top_items: Vec<CostDriver>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(get_metadata).put(update_metadata))
        .route("/mode", put(set_mode))
        .route("/items", get(list_items).post(add_root_item))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:id/children", post(add_child_item))
        .route("/items/:id/toggle", post(toggle_item))
        .route("/items/:id/detail", post(save_item_detail))
        .route("/ingest", post(ingest_items))
        .route("/analysis", get(analysis))
        .route("/breakdown", get(breakdown))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, workspace: EstimateWorkspace) -> std::io::Result<()> {
    let state = AppState::new(workspace);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_metadata(State(state): State<AppState>) -> Json<EstimateMetadata> {
    let workspace = state.workspace();
    let metadata = {
        let guard = workspace.read();
        guard.metadata().clone()
    };
    Json(metadata)
}

async fn update_metadata(
    State(state): State<AppState>,
    Json(payload): Json<MetadataPayload>,
) -> Result<Json<EstimateMetadata>, ApiError> {
    if payload.project_name.trim().is_empty() {
        return Err(ApiError::invalid("project_name must not be empty"));
    }
    let workspace = state.workspace();
    let current = {
        let mut guard = workspace.write();
        let mut metadata = guard.metadata().clone();
        metadata.project_name = payload.project_name;
        if let Some(client) = payload.client {
            metadata.client = client;
        }
        if let Some(location) = payload.location {
            metadata.location = location;
        }
        if let Some(status) = payload.status {
            metadata.status = status;
        }
        if let Some(currency) = payload.currency {
            metadata.currency = currency;
        }
        guard.set_metadata(metadata);
        guard.metadata().clone()
    };
    Ok(Json(current))
}

async fn set_mode(
    State(state): State<AppState>,
    Json(payload): Json<ModePayload>,
) -> Json<ModePayload> {
    let workspace = state.workspace();
    workspace.write().set_mode(payload.mode);
    Json(payload)
}

async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let workspace = state.workspace();
    let guard = workspace.read();
    let mode = match query.mode.as_deref() {
        Some(raw) => ViewMode::from_str(raw)
            .ok_or_else(|| ApiError::invalid(format!("unknown view mode '{raw}'")))?,
        None => guard.mode(),
    };
    let items = crate::view::project(guard.items(), mode).into_owned();
    Ok(Json(ItemsResponse {
        mode,
        total: guard.grand_total(),
        items,
    }))
}

fn find_item(workspace: &EstimateWorkspace, id: &NodeId) -> Result<CostNode, ApiError> {
    workspace
        .find(id)
        .cloned()
        .ok_or_else(|| ApiError::item_not_found(id))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CostNode>, ApiError> {
    let id = NodeId::new(id);
    let workspace = state.workspace();
    let node = find_item(&workspace.read(), &id)?;
    Ok(Json(node))
}

async fn add_root_item(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CostNode>), ApiError> {
    let workspace = state.workspace();
    let created = {
        let mut guard = workspace.write();
        let id = guard.add_root()?;
        find_item(&guard, &id)
            .map_err(|_| ApiError::internal("item not found after creation"))?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn add_child_item(
    State(state): State<AppState>,
    Path(parent): Path<String>,
) -> Result<(StatusCode, Json<CostNode>), ApiError> {
    let parent = NodeId::new(parent);
    let workspace = state.workspace();
    let created = {
        let mut guard = workspace.write();
        let id = guard
            .add_child(&parent)?
            .ok_or_else(|| ApiError::item_not_found(&parent))?;
        find_item(&guard, &id)
            .map_err(|_| ApiError::internal("item not found after creation"))?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(edit): Json<NodeEdit>,
) -> Result<Json<CostNode>, ApiError> {
    let id = NodeId::new(id);
    let workspace = state.workspace();
    let updated = {
        let mut guard = workspace.write();
        if !guard.update_field(&id, edit)? {
            return Err(ApiError::item_not_found(&id));
        }
        find_item(&guard, &id)?
    };
    Ok(Json(updated))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = NodeId::new(id);
    let workspace = state.workspace();
    let removed = workspace.write().delete(&id)?;
    if !removed {
        return Err(ApiError::item_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CostNode>, ApiError> {
    let id = NodeId::new(id);
    let workspace = state.workspace();
    let node = {
        let mut guard = workspace.write();
        find_item(&guard, &id)?;
        if !guard.toggle_expand(&id) {
            return Err(ApiError::Conflict(format!(
                "expansion is fixed in the {} view",
                guard.mode()
            )));
        }
        find_item(&guard, &id)?
    };
    Ok(Json(node))
}

async fn save_item_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<DetailUpdate>,
) -> Result<Json<CostNode>, ApiError> {
    let id = NodeId::new(id);
    let workspace = state.workspace();
    let node = {
        let mut guard = workspace.write();
        if !guard.save_detail(&id, update)? {
            return Err(ApiError::not_found(format!("terminal item {id} not found")));
        }
        find_item(&guard, &id)?
    };
    Ok(Json(node))
}

async fn ingest_items(
    State(state): State<AppState>,
    Json(descriptors): Json<Vec<RawItemDescriptor>>,
) -> Result<(StatusCode, Json<IngestSummary>), ApiError> {
    let workspace = state.workspace();
    let summary = workspace.write().ingest(descriptors)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn analysis(State(state): State<AppState>) -> Json<AnalysisResponse> {
    let workspace = state.workspace();
    let guard = workspace.read();
    let lines = crate::analysis::summary_lines(guard.items());
    Json(AnalysisResponse {
        payload: lines.join("\n"),
        lines,
    })
}

async fn breakdown(State(state): State<AppState>) -> Result<Json<BreakdownResponse>, ApiError> {
    let workspace = state.workspace();
    let guard = workspace.read();
    Ok(Json(BreakdownResponse {
        total: guard.grand_total(),
        currency: guard.metadata().currency.clone(),
        categories: guard.category_breakdown()?,
        top_items: guard.top_cost_items()?,
    }))
}
