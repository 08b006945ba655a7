use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::db::{Database, ShareError};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// Lookup failures are safe to expose and come back as BAD_REQUEST.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn share_error(e: ShareError) -> (StatusCode, String) {
    match e {
        ShareError::DanglingParent(_) => {
            tracing::warn!("Share rejected: {}", e);
            (StatusCode::NOT_FOUND, e.to_string())
        }
        ShareError::Storage(_) => internal_error(e),
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Models
// ============================================================

pub async fn create_model(
    State(db): State<Database>,
    Json(input): Json<CreateModelInput>,
) -> Result<(StatusCode, Json<Model>), (StatusCode, String)> {
    db.create_model(input)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(internal_error)
}

/// Model metadata only. Source text is reachable through links alone.
pub async fn get_model(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModelSummary>, (StatusCode, String)> {
    db.get_model(id)
        .map_err(internal_error)?
        .map(|m| Json(m.into()))
        .ok_or((StatusCode::NOT_FOUND, "Model not found".to_string()))
}

pub async fn list_derivations(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ModelSummary>>, (StatusCode, String)> {
    db.get_model(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Model not found".to_string()))?;

    let derivations = db.get_derivations(id).map_err(internal_error)?;
    Ok(Json(derivations.into_iter().map(Into::into).collect()))
}

pub async fn get_lineage(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ModelSummary>>, (StatusCode, String)> {
    let lineage = db.get_lineage(id).map_err(internal_error)?;
    if lineage.is_empty() {
        return Err((StatusCode::NOT_FOUND, "Model not found".to_string()));
    }
    Ok(Json(lineage))
}

// ============================================================
// Sharing
// ============================================================

pub async fn share_model(
    State(db): State<Database>,
    Json(input): Json<ShareInput>,
) -> Result<(StatusCode, Json<ShareResult>), (StatusCode, String)> {
    db.share_model(input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(share_error)
}

pub async fn resolve_link(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolvedLink>, (StatusCode, String)> {
    db.resolve_link(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Link not found".to_string()))
}
