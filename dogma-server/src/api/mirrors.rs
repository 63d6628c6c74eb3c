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

//! Mirror CRUD and request-initiated runs (SPEC_FULL.md §6
//! `/projects/{p}/mirrors[/{id}][/run]`). Descriptors are ordinary JSON
//! entries under `/mirrors/<id>.json` in the project's meta-repository —
//! there is no separate mirror store, matching how the scheduler already
//! reads them (`dogma-mirror::scheduler::MIRROR_PATH_PATTERN`).

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::{AppState, ACCESS_CONTROL_PROJECT};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use dogma_core::{Author, Change, CommitMessage, EntryContent, Revision, META_REPOSITORY_NAME};
use dogma_mirror::{
    load_credential, AccessRule, Direction, MirrorAccessController, MirrorDescriptor, TaskStatus,
};
use dogma_storage::FindOptions;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/:p/mirrors", get(list_mirrors).post(create_mirror))
        .route(
            "/projects/:p/mirrors/:id",
            get(get_mirror).put(update_mirror).delete(delete_mirror),
        )
        .route("/projects/:p/mirrors/:id/run", axum::routing::post(run_mirror))
}

fn mirror_path(id: &str) -> String {
    format!("/mirrors/{id}.json")
}

async fn list_mirrors(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
) -> Result<Json<Vec<MirrorDescriptor>>, ApiError> {
    let log = state.executor.commit_log(&project, META_REPOSITORY_NAME)?;
    if log.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let entries = log.find(
        Revision::HEAD,
        dogma_mirror::MIRROR_PATH_PATTERN,
        FindOptions {
            fetch_content: true,
            max_entries: None,
        },
    )?;
    let mut descriptors = Vec::new();
    for entry in entries {
        if let Some(json) = entry.content.as_json() {
            if let Ok(d) = serde_json::from_value::<MirrorDescriptor>(json.clone()) {
                descriptors.push(d);
            }
        }
    }
    Ok(Json(descriptors))
}

async fn get_mirror(
    State(state): State<Arc<AppState>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<MirrorDescriptor>, ApiError> {
    let log = state.executor.commit_log(&project, META_REPOSITORY_NAME)?;
    let entry = log.get(Revision::HEAD, &mirror_path(&id))?;
    let json = entry
        .content
        .as_json()
        .ok_or_else(|| ApiError::BadRequest("mirror entry is not JSON".to_string()))?;
    let descriptor = serde_json::from_value(json.clone())
        .map_err(|e| ApiError::BadRequest(format!("malformed mirror descriptor: {e}")))?;
    Ok(Json(descriptor))
}

async fn write_mirror(
    state: &Arc<AppState>,
    author: Author,
    project: &str,
    descriptor: &MirrorDescriptor,
) -> Result<(), ApiError> {
    validate_descriptor(descriptor)?;
    let value = serde_json::to_value(descriptor)
        .map_err(|e| ApiError::BadRequest(format!("cannot serialize mirror descriptor: {e}")))?;
    state
        .executor
        .push(
            author,
            project,
            META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Update mirror {}", descriptor.id)),
            vec![Change::upsert(mirror_path(&descriptor.id), EntryContent::Json(value))],
        )
        .await?;
    Ok(())
}

fn validate_descriptor(descriptor: &MirrorDescriptor) -> Result<(), ApiError> {
    cron::Schedule::from_str(&descriptor.cron)
        .map_err(|e| ApiError::BadRequest(format!("invalid cron expression: {e}")))?;
    Ok(())
}

async fn create_mirror(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(project): Path<String>,
    Json(descriptor): Json<MirrorDescriptor>,
) -> Result<StatusCode, ApiError> {
    write_mirror(&state, author, &project, &descriptor).await?;
    Ok(StatusCode::CREATED)
}

async fn update_mirror(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, id)): Path<(String, String)>,
    Json(mut descriptor): Json<MirrorDescriptor>,
) -> Result<StatusCode, ApiError> {
    descriptor.id = id;
    write_mirror(&state, author, &project, &descriptor).await?;
    Ok(StatusCode::OK)
}

async fn delete_mirror(
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
            CommitMessage::summary_only(format!("Remove mirror {id}")),
            vec![Change::remove(mirror_path(&id))],
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_mirror(
    State(state): State<Arc<AppState>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<TaskStatus>, ApiError> {
    let log = state.executor.commit_log(&project, META_REPOSITORY_NAME)?;
    let entry = log.get(Revision::HEAD, &mirror_path(&id))?;
    let json = entry
        .content
        .as_json()
        .ok_or_else(|| ApiError::BadRequest("mirror entry is not JSON".to_string()))?;
    let descriptor: MirrorDescriptor = serde_json::from_value(json.clone())
        .map_err(|e| ApiError::BadRequest(format!("malformed mirror descriptor: {e}")))?;

    let access = load_access_control(&state)?;
    if !access.is_allowed(&descriptor.remote_uri) {
        return Err(ApiError::Forbidden(format!(
            "mirror {} is not permitted by access control: {}",
            descriptor.id, descriptor.remote_uri
        )));
    }

    let credential = match &descriptor.credential_id {
        Some(id) => Some(load_credential(
            &state.executor,
            state.credential_cipher.as_ref(),
            &project,
            &descriptor.local_repo,
            id,
        )?),
        None => None,
    };

    // A request-initiated run has a hard 5-minute ceiling (SPEC_FULL.md §5
    // "Cancellation & timeouts"), unlike a scheduled tick.
    let result = tokio::time::timeout(Duration::from_secs(300), async {
        match descriptor.direction {
            Direction::RemoteToLocal => {
                dogma_mirror::sync_remote_to_local(
                    Arc::clone(&state.executor),
                    project.clone(),
                    descriptor,
                    credential,
                    state.config.mirror.scratch_dir.clone(),
                    state.config.mirror.max_num_files,
                    state.config.mirror.max_num_bytes,
                )
                .await
            }
            Direction::LocalToRemote => {
                dogma_mirror::sync_local_to_remote(
                    Arc::clone(&state.executor),
                    project.clone(),
                    descriptor,
                    credential,
                    state.config.mirror.scratch_dir.clone(),
                )
                .await
            }
        }
    })
    .await
    .map_err(|_| ApiError::Conflict("mirror run exceeded the 5-minute request ceiling".to_string()))?;

    Ok(Json(result?))
}

fn load_access_control(state: &Arc<AppState>) -> Result<MirrorAccessController, ApiError> {
    let log = state.executor.commit_log(ACCESS_CONTROL_PROJECT, META_REPOSITORY_NAME)?;
    if log.is_empty() {
        return Ok(MirrorAccessController::new(Vec::new()));
    }
    let entries = log.find(
        Revision::HEAD,
        dogma_mirror::ACCESS_RULE_PATH_PATTERN,
        FindOptions {
            fetch_content: true,
            max_entries: None,
        },
    )?;
    let mut rules = Vec::new();
    for entry in entries {
        if let Some(json) = entry.content.as_json() {
            if let Ok(rule) = serde_json::from_value::<AccessRule>(json.clone()) {
                rules.push(rule);
            }
        }
    }
    Ok(MirrorAccessController::new(rules))
}
