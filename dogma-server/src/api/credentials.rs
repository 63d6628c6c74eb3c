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

//! Mirror credential CRUD (SPEC_FULL.md §6 reserved paths
//! `/credentials/<id>.json`, `/repos/<repo>/credentials/<id>.json`).
//! Secrets are sealed under `state.credential_cipher` the moment they
//! arrive and never unsealed again on this path — listing and reading
//! back only ever return the sealed, hex-encoded form.

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use dogma_core::{Author, Change, CommitMessage, EntryContent, Revision, META_REPOSITORY_NAME};
use dogma_mirror::{
    list_sealed_credentials, project_credential_path, repo_credential_path, Credential,
    SealedCredential,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/:p/credentials",
            get(list_credentials).post(create_project_credential),
        )
        .route(
            "/projects/:p/credentials/:id",
            get(get_project_credential)
                .put(update_project_credential)
                .delete(delete_project_credential),
        )
        .route(
            "/projects/:p/repos/:repo/credentials/:id",
            get(get_repo_credential)
                .put(update_repo_credential)
                .delete(delete_repo_credential),
        )
}

async fn list_credentials(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
) -> Result<Json<Vec<SealedCredential>>, ApiError> {
    let sealed = list_sealed_credentials(&state.executor, &project)?;
    Ok(Json(sealed))
}

async fn write_credential(
    state: &Arc<AppState>,
    author: Author,
    project: &str,
    path: String,
    credential: &Credential,
) -> Result<(), ApiError> {
    let sealed = credential
        .seal(state.credential_cipher.as_ref())
        .map_err(|e| ApiError::BadRequest(format!("cannot seal credential: {e}")))?;
    let value = serde_json::to_value(&sealed)
        .map_err(|e| ApiError::BadRequest(format!("cannot serialize sealed credential: {e}")))?;
    state
        .executor
        .push(
            author,
            project,
            META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Update credential {}", sealed.id)),
            vec![Change::upsert(path, EntryContent::Json(value))],
        )
        .await?;
    Ok(())
}

async fn get_sealed(
    state: &Arc<AppState>,
    project: &str,
    path: &str,
) -> Result<Json<SealedCredential>, ApiError> {
    let log = state.executor.commit_log(project, META_REPOSITORY_NAME)?;
    let entry = log.get(Revision::HEAD, path)?;
    let json = entry
        .content
        .as_json()
        .ok_or_else(|| ApiError::BadRequest("credential entry is not JSON".to_string()))?;
    let sealed = serde_json::from_value(json.clone())
        .map_err(|e| ApiError::BadRequest(format!("malformed credential entry: {e}")))?;
    Ok(Json(sealed))
}

async fn get_project_credential(
    State(state): State<Arc<AppState>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<SealedCredential>, ApiError> {
    get_sealed(&state, &project, &project_credential_path(&id)).await
}

async fn create_project_credential(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(project): Path<String>,
    Json(credential): Json<Credential>,
) -> Result<StatusCode, ApiError> {
    let path = project_credential_path(&credential.id);
    write_credential(&state, author, &project, path, &credential).await?;
    Ok(StatusCode::CREATED)
}

async fn update_project_credential(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, id)): Path<(String, String)>,
    Json(mut credential): Json<Credential>,
) -> Result<StatusCode, ApiError> {
    credential.id = id.clone();
    let path = project_credential_path(&id);
    write_credential(&state, author, &project, path, &credential).await?;
    Ok(StatusCode::OK)
}

async fn delete_project_credential(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .executor
        .push(
            author,
            &project,
            META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Remove credential {id}")),
            vec![Change::remove(project_credential_path(&id))],
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_repo_credential(
    State(state): State<Arc<AppState>>,
    Path((project, repo, id)): Path<(String, String, String)>,
) -> Result<Json<SealedCredential>, ApiError> {
    get_sealed(&state, &project, &repo_credential_path(&repo, &id)).await
}

async fn update_repo_credential(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo, id)): Path<(String, String, String)>,
    Json(mut credential): Json<Credential>,
) -> Result<StatusCode, ApiError> {
    credential.id = id.clone();
    let path = repo_credential_path(&repo, &id);
    write_credential(&state, author, &project, path, &credential).await?;
    Ok(StatusCode::OK)
}

async fn delete_repo_credential(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .executor
        .push(
            author,
            &project,
            META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Remove credential {id}")),
            vec![Change::remove(repo_credential_path(&repo, &id))],
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
