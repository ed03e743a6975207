//! File-level operations, defined purely as tree mutations on the in-memory
//! project. Durable persistence stays an explicit project save.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use common::{FileKind, FileNode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects/{id}/files", post(create_file))
        .route("/api/projects/{id}/files/deselect", post(deselect_file))
        .route(
            "/api/projects/{id}/files/{file_id}",
            put(update_file).delete(delete_file),
        )
        .route(
            "/api/projects/{id}/files/{file_id}/select",
            post(select_file),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFileRequest {
    name: String,
    kind: FileKind,
    parent_id: Option<String>,
}

#[derive(Deserialize)]
struct UpdateFileRequest {
    name: Option<String>,
    content: Option<String>,
}

/// A session lookup only knows the caller's own projects, so a miss says
/// "not found" even when the record exists under another owner. Consult the
/// adapter so that foreign ids surface as access denied instead.
fn refine_not_found(state: &AppState, user: &str, project_id: &str, err: ApiError) -> ApiError {
    if matches!(err, ApiError::NotFound) {
        if let Err(repo_err) = state.repo.get(user, project_id) {
            return repo_err;
        }
    }
    err
}

async fn create_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<CreateFileRequest>,
) -> Result<(StatusCode, Json<FileNode>), ApiError> {
    let node = state
        .with_workspace(&user, |ws| {
            ws.ensure_active(&id)?;
            ws.create_file(&payload.name, payload.kind, payload.parent_id.as_deref())
        })?
        .map_err(|err| refine_not_found(&state, &user, &id, err))?;
    Ok((StatusCode::CREATED, Json(node)))
}

async fn update_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, file_id)): Path<(String, String)>,
    Json(payload): Json<UpdateFileRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .with_workspace(&user, |ws| {
            ws.ensure_active(&id)?;
            if let Some(name) = &payload.name {
                ws.rename_file(&file_id, name)?;
            }
            if let Some(content) = &payload.content {
                ws.update_file_content(&file_id, content)?;
            }
            Ok(())
        })?
        .map_err(|err| refine_not_found(&state, &user, &id, err))?;
    Ok(Json(json!({ "message": "File updated" })))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state
        .with_workspace(&user, |ws| {
            ws.ensure_active(&id)?;
            ws.delete_file(&file_id)
        })?
        .map_err(|err| refine_not_found(&state, &user, &id, err))?;
    Ok(Json(json!({ "message": "File deleted" })))
}

async fn select_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state
        .with_workspace(&user, |ws| {
            ws.ensure_active(&id)?;
            ws.set_active_file(Some(&file_id))
        })?
        .map_err(|err| refine_not_found(&state, &user, &id, err))?;
    Ok(Json(json!({ "message": "File selected" })))
}

async fn deselect_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .with_workspace(&user, |ws| {
            ws.ensure_active(&id)?;
            ws.set_active_file(None)
        })?
        .map_err(|err| refine_not_found(&state, &user, &id, err))?;
    Ok(Json(json!({ "message": "Selection cleared" })))
}
