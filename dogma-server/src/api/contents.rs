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

//! Tree listing, content read/write, history, and diff (SPEC_FULL.md §6
//! `/projects/{p}/repos/{r}/{tree,contents,commits,compare}`), including
//! the long-poll watch binding on `GET .../contents`.

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Extension, Json, Router};
use dogma_core::{Author, Change, ChangeContent, CommitMessage, Entry, EntryContent, EntryType, Revision};
use dogma_storage::FindOptions;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/:p/repos/:r/tree", get(tree_root))
        .route("/projects/:p/repos/:r/tree/*path", get(tree))
        .route(
            "/projects/:p/repos/:r/contents",
            axum::routing::post(upsert_content),
        )
        .route(
            "/projects/:p/repos/:r/contents/*path",
            get(get_content)
                .patch(patch_content)
                .delete(remove_content),
        )
        .route("/projects/:p/repos/:r/commits", get(history_root))
        .route("/projects/:p/repos/:r/commits/*rev", get(history))
        .route("/projects/:p/repos/:r/compare", get(compare))
}

fn abs_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}

#[derive(Deserialize)]
struct RevisionQuery {
    revision: Option<i32>,
}

fn revision_of(q: &RevisionQuery) -> Revision {
    q.revision.map(Revision::new).unwrap_or(Revision::HEAD)
}

#[derive(Serialize)]
struct EntryView {
    path: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    revision: i32,
    content: Option<serde_json::Value>,
}

fn to_view(entry: Entry, fetch_content: bool) -> EntryView {
    EntryView {
        path: entry.path,
        entry_type: entry.content.entry_type(),
        revision: entry.revision.value(),
        content: if fetch_content {
            content_as_json(&entry.content)
        } else {
            None
        },
    }
}

fn content_as_json(content: &EntryContent) -> Option<serde_json::Value> {
    match content {
        EntryContent::Json(v) | EntryContent::Yaml(v) => Some(v.clone()),
        EntryContent::Text(s) => Some(serde_json::Value::String(s.clone())),
        EntryContent::Directory => None,
    }
}

async fn tree_root(
    state: State<Arc<AppState>>,
    path: Path<(String, String)>,
    query: Query<RevisionQuery>,
) -> Result<Json<Vec<EntryView>>, ApiError> {
    tree_impl(state, path, String::new(), query).await
}

async fn tree(
    State(state): State<Arc<AppState>>,
    Path((project, repo, path)): Path<(String, String, String)>,
    query: Query<RevisionQuery>,
) -> Result<Json<Vec<EntryView>>, ApiError> {
    tree_impl(State(state), Path((project, repo)), path, query).await
}

async fn tree_impl(
    State(state): State<Arc<AppState>>,
    Path((project, repo)): Path<(String, String)>,
    path: String,
    Query(query): Query<RevisionQuery>,
) -> Result<Json<Vec<EntryView>>, ApiError> {
    let log = state.executor.commit_log(&project, &repo)?;
    let pattern = if path.is_empty() {
        "/**".to_string()
    } else {
        format!("{}/**,{}", abs_path(&path), abs_path(&path))
    };
    let entries = log.find(
        revision_of(&query),
        &pattern,
        FindOptions {
            fetch_content: false,
            max_entries: None,
        },
    )?;
    Ok(Json(entries.into_iter().map(|e| to_view(e, false)).collect()))
}

#[derive(Deserialize)]
struct ContentQuery {
    revision: Option<i32>,
    #[serde(rename = "queryType")]
    query_type: Option<String>,
    expression: Option<String>,
}

async fn get_content(
    State(state): State<Arc<AppState>>,
    Path((project, repo, path)): Path<(String, String, String)>,
    Query(query): Query<ContentQuery>,
    headers: HeaderMap,
) -> Result<axum::response::Response, ApiError> {
    let path = abs_path(&path);
    let log = state.executor.commit_log(&project, &repo)?;

    let wait_ms = parse_prefer_wait(&headers);
    let if_none_match: Option<i32> = headers
        .get("if-none-match")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let entry = if let (Some(last_known), Some(timeout_ms)) = (if_none_match, wait_ms) {
        let mut commits = state.executor.subscribe_commits();
        let rev = state
            .watch_engine
            .watch_repository(
                &log,
                &mut commits,
                &project,
                &repo,
                Revision::new(last_known),
                &path,
                Some(timeout_ms),
            )
            .await;
        match rev {
            Ok(_) => log.get(Revision::HEAD, &path)?,
            Err(dogma_watch::WatchError::Cancelled) => {
                return Ok(StatusCode::NOT_MODIFIED.into_response());
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        log.get(revision_of_content(&query), &path)?
    };

    let body = apply_query(&entry.content, query.query_type.as_deref(), query.expression.as_deref())?;
    Ok(Json(EntryView {
        path: entry.path,
        entry_type: entry.content.entry_type(),
        revision: entry.revision.value(),
        content: body,
    })
    .into_response())
}

fn revision_of_content(q: &ContentQuery) -> Revision {
    q.revision.map(Revision::new).unwrap_or(Revision::HEAD)
}

/// `Prefer: wait=<seconds>` (SPEC_FULL.md §6 "Long-poll watch"); returns
/// the wait duration in milliseconds.
fn parse_prefer_wait(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get("prefer")?.to_str().ok()?;
    let seconds: f64 = value.strip_prefix("wait=")?.trim().parse().ok()?;
    Some((seconds * 1000.0) as u64)
}

/// `queryType=JSON_PATH` implements RFC-6901 JSON Pointer traversal of the
/// entry's JSON/YAML content rather than full JSONPath grammar (no
/// JSONPath evaluator is part of this stack); `IDENTITY` (the default)
/// returns the content unchanged.
fn apply_query(
    content: &EntryContent,
    query_type: Option<&str>,
    expression: Option<&str>,
) -> Result<Option<serde_json::Value>, ApiError> {
    match query_type {
        None | Some("IDENTITY") => Ok(content_as_json(content)),
        Some("JSON_PATH") => {
            let json = content
                .as_json()
                .ok_or_else(|| ApiError::BadRequest("JSON_PATH requires a JSON/YAML entry".to_string()))?;
            let pointer = expression.unwrap_or("");
            Ok(json.pointer(pointer).cloned())
        }
        Some(other) => Err(ApiError::BadRequest(format!("unsupported queryType: {other}"))),
    }
}

#[derive(Deserialize)]
struct UpsertRequest {
    path: String,
    content: serde_json::Value,
    #[serde(rename = "entryType", default = "default_entry_type")]
    entry_type: EntryType,
    #[serde(rename = "commitMessage")]
    commit_message: CommitMessageRequest,
    #[serde(rename = "baseRevision")]
    base_revision: Option<i32>,
}

fn default_entry_type() -> EntryType {
    EntryType::Json
}

#[derive(Deserialize)]
struct CommitMessageRequest {
    summary: String,
    detail: Option<String>,
}

fn to_commit_message(req: CommitMessageRequest) -> CommitMessage {
    match req.detail {
        Some(detail) => CommitMessage {
            summary: req.summary,
            detail: Some(dogma_core::CommitDetail::Markdown(detail)),
        },
        None => CommitMessage::summary_only(req.summary),
    }
}

fn to_entry_content(entry_type: EntryType, value: serde_json::Value) -> Result<EntryContent, ApiError> {
    match entry_type {
        EntryType::Json => Ok(EntryContent::Json(value)),
        EntryType::Yaml => Ok(EntryContent::Yaml(value)),
        EntryType::Text => {
            let text = value
                .as_str()
                .ok_or_else(|| ApiError::BadRequest("TEXT content must be a JSON string".to_string()))?;
            Ok(EntryContent::Text(text.to_string()))
        }
        EntryType::Directory => Err(ApiError::BadRequest("cannot upsert a DIRECTORY entry".to_string())),
    }
}

#[derive(Serialize)]
struct PushResult {
    revision: i32,
}

async fn upsert_content(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo)): Path<(String, String)>,
    Json(req): Json<UpsertRequest>,
) -> Result<Json<PushResult>, ApiError> {
    let path = abs_path(&req.path);
    let content = to_entry_content(req.entry_type, req.content)?;
    let base = req.base_revision.map(Revision::new).unwrap_or(Revision::HEAD);
    let revision = state
        .executor
        .push(
            author,
            &project,
            &repo,
            base,
            to_commit_message(req.commit_message),
            vec![Change::upsert(path, content)],
        )
        .await?;
    Ok(Json(PushResult {
        revision: revision.value(),
    }))
}

#[derive(Deserialize)]
struct PatchRequest {
    #[serde(rename = "type")]
    kind: PatchKind,
    content: serde_json::Value,
    #[serde(rename = "commitMessage")]
    commit_message: CommitMessageRequest,
    #[serde(rename = "baseRevision")]
    base_revision: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum PatchKind {
    JsonPatch,
    TextPatch,
}

async fn patch_content(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo, path)): Path<(String, String, String)>,
    Json(req): Json<PatchRequest>,
) -> Result<Json<PushResult>, ApiError> {
    let path = abs_path(&path);
    let change_content = match req.kind {
        PatchKind::JsonPatch => ChangeContent::JsonPatch(req.content),
        PatchKind::TextPatch => {
            let text = req
                .content
                .as_str()
                .ok_or_else(|| ApiError::BadRequest("TEXT_PATCH content must be a JSON string".to_string()))?;
            ChangeContent::TextPatch(text.to_string())
        }
    };
    let base = req.base_revision.map(Revision::new).unwrap_or(Revision::HEAD);
    let revision = state
        .executor
        .push(
            author,
            &project,
            &repo,
            base,
            to_commit_message(req.commit_message),
            vec![Change {
                path,
                content: change_content,
            }],
        )
        .await?;
    Ok(Json(PushResult {
        revision: revision.value(),
    }))
}

#[derive(Deserialize)]
struct RemoveRequest {
    #[serde(rename = "commitMessage")]
    commit_message: CommitMessageRequest,
    #[serde(rename = "baseRevision")]
    base_revision: Option<i32>,
}

async fn remove_content(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Path((project, repo, path)): Path<(String, String, String)>,
    body: Option<Json<RemoveRequest>>,
) -> Result<Json<PushResult>, ApiError> {
    let path = abs_path(&path);
    let (message, base) = match body {
        Some(Json(req)) => (
            to_commit_message(req.commit_message),
            req.base_revision.map(Revision::new).unwrap_or(Revision::HEAD),
        ),
        None => (CommitMessage::summary_only(format!("Remove {path}")), Revision::HEAD),
    };
    let revision = state
        .executor
        .push(author, &project, &repo, base, message, vec![Change::remove(path)])
        .await?;
    Ok(Json(PushResult {
        revision: revision.value(),
    }))
}

#[derive(Deserialize)]
struct HistoryQuery {
    path: Option<String>,
    to: Option<i32>,
    #[serde(rename = "maxEntries")]
    max_entries: Option<usize>,
}

#[derive(Serialize)]
struct LogEntryView {
    revision: i32,
    author: Author,
    #[serde(rename = "whenMillis")]
    when_millis: i64,
    summary: String,
    #[serde(rename = "pathsChanged")]
    paths_changed: Vec<String>,
}

async fn history_root(
    state: State<Arc<AppState>>,
    path: Path<(String, String)>,
    query: Query<HistoryQuery>,
) -> Result<Json<Vec<LogEntryView>>, ApiError> {
    history_impl(state, path, Revision::HEAD.value(), query).await
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path((project, repo, rev)): Path<(String, String, i32)>,
    query: Query<HistoryQuery>,
) -> Result<Json<Vec<LogEntryView>>, ApiError> {
    history_impl(State(state), Path((project, repo)), rev, query).await
}

async fn history_impl(
    State(state): State<Arc<AppState>>,
    Path((project, repo)): Path<(String, String)>,
    from: i32,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<LogEntryView>>, ApiError> {
    let log = state.executor.commit_log(&project, &repo)?;
    let to = query.to.unwrap_or_else(|| Revision::HEAD.value());
    let pattern = query.path.map(|p| abs_path(&p)).unwrap_or_else(|| "/**".to_string());
    let entries = log.history(Revision::new(from), Revision::new(to), &pattern, query.max_entries)?;
    Ok(Json(
        entries
            .into_iter()
            .map(|e| LogEntryView {
                revision: e.revision.value(),
                author: e.author,
                when_millis: e.when_millis,
                summary: e.message.summary,
                paths_changed: e.paths_changed,
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
struct CompareQuery {
    from: i32,
    to: i32,
    path: Option<String>,
}

async fn compare(
    State(state): State<Arc<AppState>>,
    Path((project, repo)): Path<(String, String)>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<dogma_storage::TreeDiff>, ApiError> {
    let log = state.executor.commit_log(&project, &repo)?;
    let diff = log.diff(Revision::new(query.from), Revision::new(query.to))?;
    let diff = match query.path {
        Some(path) => {
            let pattern = dogma_core::PathPattern::parse(&abs_path(&path)).map_err(dogma_storage::StorageError::Core)?;
            dogma_storage::TreeDiff {
                changes: diff
                    .changes
                    .into_iter()
                    .filter(|(p, _)| pattern.matches(p))
                    .collect(),
            }
        }
        None => diff,
    };
    Ok(Json(diff))
}
