//! Project CRUD and session-level operations.
//!
//! Mutations apply to the caller's in-memory session first; the durable write
//! is a follow-up. When that write fails the handler reports the error and
//! the session keeps the change, so a later save can retry it.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use common::tree;
use common::{FileNode, Project, ProjectSummary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::workspace::{validate_description, validate_name};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/save", post(save_projects))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/open", post(open_project))
        .route("/api/projects/{id}/bundle", get(bundle_project))
        .route("/api/session", get(session_state))
}

#[derive(Deserialize)]
struct CreateProjectRequest {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProjectRequest {
    name: Option<String>,
    description: Option<String>,
    files: Option<Vec<FileNode>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionState {
    active_project: Option<String>,
    active_file: Option<FileNode>,
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state.with_workspace(&user, |ws| ws.create_project(&payload.name))??;
    if let Err(err) = state.repo.create(&project) {
        // The session keeps the project; a later save retries the write.
        warn!(project = %project.id, %err, "durable create failed");
        return Err(err);
    }
    info!(project = %project.id, owner = %user, "created project");
    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    Ok(Json(state.repo.list(&user)?))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    // The session copy may be ahead of durable storage.
    if let Some(project) = state.with_workspace(&user, |ws| ws.project(&id).cloned())? {
        return Ok(Json(project));
    }
    Ok(Json(state.repo.get(&user, &id)?))
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    // Full-document replace against the stored record; ownership is enforced
    // at the adapter boundary.
    let mut project = state.repo.get(&user, &id)?;
    if let Some(name) = &payload.name {
        let name = name.trim();
        validate_name(name)?;
        project.name = name.to_string();
    }
    if let Some(description) = &payload.description {
        validate_description(description)?;
        project.description = description.clone();
    }
    if let Some(files) = payload.files {
        project.files = files;
    }
    project.updated_at = Utc::now();
    state.repo.update(&user, &project)?;
    state.with_workspace(&user, |ws| ws.replace_project(project.clone()))?;
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.repo.delete(&user, &id)?;
    state.with_workspace(&user, |ws| ws.delete_project(&id))?;
    info!(project = %id, owner = %user, "deleted project");
    Ok(Json(json!({ "message": "Project deleted" })))
}

async fn open_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    state
        .with_workspace(&user, |ws| ws.load_project(&id).cloned())?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn save_projects(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let Some(projects) = state.with_workspace(&user, |ws| ws.prepare_save())? else {
        return Ok(Json(json!({ "message": "No active project" })));
    };
    // Full-list overwrite; a failure leaves the in-memory state intact and
    // the save can simply be retried.
    for project in &projects {
        state.repo.update(&user, project)?;
    }
    info!(owner = %user, count = projects.len(), "saved projects");
    Ok(Json(json!({ "message": "Project saved" })))
}

/// The flat `path -> content` view consumed by the previewer.
async fn bundle_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    if let Some(files) =
        state.with_workspace(&user, |ws| ws.project(&id).map(|p| tree::flatten(&p.files)))?
    {
        return Ok(Json(files));
    }
    let project = state.repo.get(&user, &id)?;
    Ok(Json(tree::flatten(&project.files)))
}

async fn session_state(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<SessionState>, ApiError> {
    let snapshot = state.with_workspace(&user, |ws| SessionState {
        active_project: ws.active_project().map(|p| p.id.clone()),
        active_file: ws.active_file().cloned(),
    })?;
    Ok(Json(snapshot))
}
