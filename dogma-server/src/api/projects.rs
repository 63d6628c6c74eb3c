// Copyright 2025 Central Dogma Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Project and repository lifecycle (SPEC_FULL.md §6: `/projects`,
//! `/projects/{p}/repos`, revision normalization, status, migration).

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use dogma_core::{Revision, RepositoryStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:p", axum::routing::delete(remove_project).patch(unremove_project))
        .route("/projects/:p/repos", get(list_repos).post(create_repo))
        .route(
            "/projects/:p/repos/:r",
            axum::routing::delete(remove_repo).patch(unremove_repo),
        )
        .route("/projects/:p/repos/:r/removed", axum::routing::delete(purge_repo))
        .route("/projects/:p/repos/:r/revision/:rev", get(normalize_revision))
        .route("/projects/:p/repos/:r/status", axum::routing::put(set_repo_status))
        .route(
            "/projects/:p/repos/:r/migrate/encrypted",
            post(migrate_encrypted),
        )
}

#[derive(Serialize)]
struct ProjectView {
    name: String,
    status: RepositoryStatus,
    #[serde(rename = "createdAtMillis")]
    created_at_millis: i64,
}

async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ProjectView>>, ApiError> {
    let mut views = Vec::new();
    for name in state.executor.project_names() {
        let meta = state.executor.project_meta(&name)?;
        views.push(ProjectView {
            name: meta.name,
            status: meta.status,
            created_at_millis: meta.created_at_millis,
        });
    }
    Ok(Json(views))
}

#[derive(Deserialize)]
struct CreateProjectRequest {
    name: String,
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<StatusCode, ApiError> {
    state.executor.create_project(author, &req.name).await?;
    Ok(StatusCode::CREATED)
}

async fn remove_project(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(project): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.executor.remove_project(author, &project).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unremove_project(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(project): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    validate_unremove_patch(&patch)?;
    state.executor.unremove_project(author, &project).await?;
    Ok(StatusCode::OK)
}

/// SPEC_FULL.md §6 "body = JSON-patch restoring `/status` to `active`":
/// accepts a single RFC-6902 `replace` operation targeting `/status`.
fn validate_unremove_patch(patch: &serde_json::Value) -> Result<(), ApiError> {
    let ops = patch
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("patch body must be a JSON array".to_string()))?;
    let restores_status = ops.iter().any(|op| {
        op.get("op").and_then(|v| v.as_str()) == Some("replace")
            && op.get("path").and_then(|v| v.as_str()) == Some("/status")
            && op
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| v.eq_ignore_ascii_case("active"))
                .unwrap_or(false)
    });
    if !restores_status {
        return Err(ApiError::BadRequest(
            "patch must replace /status with \"active\"".to_string(),
        ));
    }
    Ok(())
}

#[derive(Serialize)]
struct RepoView {
    name: String,
    status: RepositoryStatus,
    encrypted: bool,
    #[serde(rename = "createdAtMillis")]
    created_at_millis: i64,
}

async fn list_repos(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
) -> Result<Json<Vec<RepoView>>, ApiError> {
    let mut views = Vec::new();
    for name in state.executor.repository_names(&project)? {
        let meta = state.executor.repository_meta(&project, &name)?;
        views.push(RepoView {
            name: meta.name,
            status: meta.status,
            encrypted: meta.encrypted,
            created_at_millis: meta.created_at_millis,
        });
    }
    Ok(Json(views))
}

#[derive(Deserialize)]
struct CreateRepoRequest {
    name: String,
    #[serde(default)]
    encrypt: bool,
}

async fn create_repo(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(project): Path<String>,
    Json(req): Json<CreateRepoRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .executor
        .create_repository(author, &project, &req.name, req.encrypt)
        .await?;
    Ok(StatusCode::CREATED)
}

async fn remove_repo(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.executor.remove_repository(author, &project, &repo).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn purge_repo(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.executor.purge_repository(author, &project, &repo).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unremove_repo(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo)): Path<(String, String)>,
    Json(patch): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    validate_unremove_patch(&patch)?;
    state.executor.unremove_repository(author, &project, &repo).await?;
    Ok(StatusCode::OK)
}

#[derive(Serialize)]
struct RevisionView {
    revision: i32,
}

async fn normalize_revision(
    State(state): State<Arc<AppState>>,
    Path((project, repo, rev)): Path<(String, String, i32)>,
) -> Result<Json<RevisionView>, ApiError> {
    let log = state.executor.commit_log(&project, &repo)?;
    let normalized = log.normalize(Revision::new(rev))?;
    Ok(Json(RevisionView {
        revision: normalized.value(),
    }))
}

#[derive(Deserialize)]
struct SetStatusRequest {
    status: RepositoryStatus,
}

async fn set_repo_status(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo)): Path<(String, String)>,
    Json(req): Json<SetStatusRequest>,
) -> Result<StatusCode, ApiError> {
    match req.status {
        RepositoryStatus::Active => {
            let patch = serde_json::json!([{"op": "replace", "path": "/status", "value": "active"}]);
            validate_unremove_patch(&patch)?;
            state.executor.unremove_repository(author, &project, &repo).await?;
        }
        RepositoryStatus::ReadOnly => {
            // There is no dedicated read-only command on the executor; a
            // repository-scoped read-only toggle is modeled as the same
            // server-wide writable gate used by `PATCH /status`, applied
            // with a repository target — see `set_server_status`.
            return Err(ApiError::BadRequest(
                "per-repository READ_ONLY is not independently settable; use PATCH /status for server-wide read-only mode".to_string(),
            ));
        }
        RepositoryStatus::Removed => {
            state.executor.remove_repository(author, &project, &repo).await?;
        }
    }
    Ok(StatusCode::OK)
}

async fn migrate_encrypted(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.executor.migrate_encrypted(author, &project, &repo).await?;
    Ok(StatusCode::OK)
}
