use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tally_core::{SyncBatch, SyncEngine, SyncReceipt};

use crate::auth::{extract_bearer_token, AuthenticatedDevice, DeviceTokenVerifier};
use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    token_verifier: Arc<DeviceTokenVerifier>,
    engine: Arc<SyncEngine>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, engine: Arc<SyncEngine>) -> Self {
        Self {
            token_verifier: Arc::new(DeviceTokenVerifier::new(config.clone())),
            engine,
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/sync/batches", post(submit_batch))
        .route("/sync/conflicts", get(list_conflicts))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let device = state.token_verifier.verify_device_token(token)?;
    request.extensions_mut().insert(device);
    Ok(next.run(request).await)
}

async fn submit_batch(
    State(state): State<AppState>,
    Extension(device): Extension<AuthenticatedDevice>,
    Json(batch): Json<SyncBatch>,
) -> Result<Json<SyncReceipt>, AppError> {
    // The token decides who the caller is; the body must agree with it.
    if batch.device_id != device.device_id
        || batch.member_id != device.member_id
        || batch.org_id != device.org_id
    {
        return Err(AppError::unauthorized(
            "Batch identity does not match the presented token",
        ));
    }

    let engine = state.engine.clone();
    let receipt = tokio::task::spawn_blocking(move || engine.submit_batch(&batch))
        .await
        .map_err(|error| AppError::internal(format!("Sync worker panicked: {error}")))??;

    tracing::info!(
        endpoint = "sync_batches",
        member = device.member_id,
        status = ?receipt.status,
        conflicts = receipt.conflicts.len(),
        "Processed sync batch"
    );
    Ok(Json(receipt))
}

#[derive(Debug, Serialize)]
struct ConflictResponse {
    id: i64,
    device_id: String,
    #[serde(rename = "type")]
    conflict_type: &'static str,
    details: serde_json::Value,
    created_at: i64,
}

#[derive(Debug, Serialize)]
struct ConflictListResponse {
    conflicts: Vec<ConflictResponse>,
}

async fn list_conflicts(
    State(state): State<AppState>,
    Extension(device): Extension<AuthenticatedDevice>,
) -> Result<Json<ConflictListResponse>, AppError> {
    let engine = state.engine.clone();
    let limit = state.config.conflict_list_limit;
    let member_id = device.member_id.clone();
    let org_id = device.org_id.clone();
    let conflicts =
        tokio::task::spawn_blocking(move || engine.conflicts_for_member(&member_id, &org_id, limit))
            .await
            .map_err(|error| AppError::internal(format!("Sync worker panicked: {error}")))??;

    let conflicts = conflicts
        .into_iter()
        .map(|conflict| ConflictResponse {
            id: conflict.id,
            device_id: conflict.device_id,
            conflict_type: conflict.conflict_type.as_str(),
            // The ledger stores details as JSON text; hand JSON back out.
            details: serde_json::from_str(&conflict.details)
                .unwrap_or(serde_json::Value::Null),
            created_at: conflict.created_at,
        })
        .collect();

    Ok(Json(ConflictListResponse { conflicts }))
}
