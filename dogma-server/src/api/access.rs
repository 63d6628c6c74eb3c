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

//! Mirror access-control CRUD (SPEC_FULL.md §6
//! `GET/POST/PUT/DELETE /mirror/access[/{id}]`, "sys-admin"): a
//! server-wide, project-independent resource, unlike every other
//! meta-repository path. Rules live as ordinary JSON entries under
//! `/mirror-access-control/<id>.json` in the reserved system project's
//! meta-repository — the same place `MirrorScheduler` reads them from.

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::{AppState, ACCESS_CONTROL_PROJECT};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use dogma_core::{Change, CommitMessage, EntryContent, Revision, META_REPOSITORY_NAME};
use dogma_mirror::AccessRule;
use dogma_storage::FindOptions;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mirror/access", get(list_rules).post(create_rule))
        .route(
            "/mirror/access/:id",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
}

fn rule_path(id: &str) -> String {
    format!("/mirror-access-control/{id}.json")
}

async fn list_rules(State(state): State<Arc<AppState>>) -> Result<Json<Vec<AccessRule>>, ApiError> {
    let log = state.executor.commit_log(ACCESS_CONTROL_PROJECT, META_REPOSITORY_NAME)?;
    if log.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let entries = log.find(
        Revision::HEAD,
        dogma_mirror::ACCESS_RULE_PATH_PATTERN,
        FindOptions {
            fetch_content: true,
            max_entries: None,
        },
    )?;
    let mut rules: Vec<AccessRule> = entries
        .into_iter()
        .filter_map(|e| e.content.as_json().and_then(|j| serde_json::from_value(j.clone()).ok()))
        .collect();
    rules.sort_by_key(|r| r.order);
    Ok(Json(rules))
}

async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AccessRule>, ApiError> {
    let log = state.executor.commit_log(ACCESS_CONTROL_PROJECT, META_REPOSITORY_NAME)?;
    let entry = log.get(Revision::HEAD, &rule_path(&id))?;
    let json = entry
        .content
        .as_json()
        .ok_or_else(|| ApiError::BadRequest("access rule entry is not JSON".to_string()))?;
    let rule = serde_json::from_value(json.clone())
        .map_err(|e| ApiError::BadRequest(format!("malformed access rule: {e}")))?;
    Ok(Json(rule))
}

async fn write_rule(state: &Arc<AppState>, author: dogma_core::Author, rule: &AccessRule) -> Result<(), ApiError> {
    let value = serde_json::to_value(rule)
        .map_err(|e| ApiError::BadRequest(format!("cannot serialize access rule: {e}")))?;
    state
        .executor
        .push(
            author,
            ACCESS_CONTROL_PROJECT,
            META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Update mirror access rule {}", rule.id)),
            vec![Change::upsert(rule_path(&rule.id), EntryContent::Json(value))],
        )
        .await?;
    Ok(())
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Json(rule): Json<AccessRule>,
) -> Result<StatusCode, ApiError> {
    write_rule(&state, author, &rule).await?;
    Ok(StatusCode::CREATED)
}

async fn update_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(mut rule): Json<AccessRule>,
) -> Result<StatusCode, ApiError> {
    rule.id = id;
    write_rule(&state, author, &rule).await?;
    Ok(StatusCode::OK)
}

async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .executor
        .push(
            author,
            ACCESS_CONTROL_PROJECT,
            META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Remove mirror access rule {id}")),
            vec![Change::remove(rule_path(&id))],
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
