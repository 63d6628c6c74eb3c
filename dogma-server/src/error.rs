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

//! `ApiError` (SPEC_FULL.md §6.1 / §7): the one place every typed core
//! error is translated into the wire error shape `{"message","exception"}`
//! and an HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dogma_executor::ExecutorError;
use dogma_mirror::MirrorError;
use dogma_storage::StorageError;
use dogma_watch::WatchError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("not modified")]
    NotModified,
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Mirror(#[from] MirrorError),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    exception: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, exception) = status_and_exception(&self);
        if status == StatusCode::NOT_MODIFIED {
            return status.into_response();
        }
        let body = ErrorBody {
            message: self.to_string(),
            exception: exception.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn status_and_exception(err: &ApiError) -> (StatusCode, &'static str) {
    match err {
        ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequestException"),
        ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "EntryNotFoundException"),
        ApiError::Conflict(_) => (StatusCode::CONFLICT, "ChangeConflictException"),
        ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "PermissionException"),
        ApiError::NotModified => (StatusCode::NOT_MODIFIED, "NotModifiedException"),
        ApiError::Executor(e) => executor_status(e),
        ApiError::Storage(e) => storage_status(e),
        ApiError::Watch(e) => match e {
            WatchError::Cancelled => (StatusCode::NOT_MODIFIED, "NotModifiedException"),
            WatchError::RepositoryNotFound(_, _) => (StatusCode::NOT_FOUND, "RepositoryNotFoundException"),
            WatchError::Storage(inner) => storage_status(inner),
        },
        ApiError::Mirror(e) => match e {
            MirrorError::NotFound(_) => (StatusCode::NOT_FOUND, "MirrorNotFoundException"),
            MirrorError::InvalidSchedule(_) | MirrorError::InvalidZone(_) => {
                (StatusCode::BAD_REQUEST, "BadRequestException")
            }
            MirrorError::Disallowed(_) => (StatusCode::FORBIDDEN, "PermissionException"),
            MirrorError::NonFastForward | MirrorError::BudgetExceeded(_) => {
                (StatusCode::CONFLICT, "ChangeConflictException")
            }
            MirrorError::Git(_) | MirrorError::Io(_) | MirrorError::CorruptState(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "StorageException")
            }
            MirrorError::Executor(inner) => executor_status(inner),
            MirrorError::Storage(inner) => storage_status(inner),
            MirrorError::CredentialNotFound(_) => (StatusCode::NOT_FOUND, "CredentialNotFoundException"),
        },
    }
}

fn executor_status(e: &ExecutorError) -> (StatusCode, &'static str) {
    match e {
        ExecutorError::ProjectNotFound(_) => (StatusCode::NOT_FOUND, "ProjectNotFoundException"),
        ExecutorError::RepositoryNotFound(_, _) => (StatusCode::NOT_FOUND, "RepositoryNotFoundException"),
        ExecutorError::ProjectAlreadyExists(_) => (StatusCode::CONFLICT, "ProjectExistsException"),
        ExecutorError::RepositoryAlreadyExists(_, _) => (StatusCode::CONFLICT, "RepositoryExistsException"),
        ExecutorError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequestException"),
        ExecutorError::ReadOnly(_, _) => (StatusCode::FORBIDDEN, "ReadOnlyException"),
        ExecutorError::ServerNotWritable | ExecutorError::ServerStopping => {
            (StatusCode::FORBIDDEN, "ReadOnlyException")
        }
        ExecutorError::NotModified => (StatusCode::NOT_MODIFIED, "NotModifiedException"),
        ExecutorError::Replication(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ReplicationException"),
        ExecutorError::Storage(inner) => storage_status(inner),
    }
}

fn storage_status(e: &StorageError) -> (StatusCode, &'static str) {
    match e {
        StorageError::RevisionNotFound(_) => (StatusCode::NOT_FOUND, "RevisionNotFoundException"),
        StorageError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "EntryNotFoundException"),
        StorageError::ChangeConflict | StorageError::RedundantChange => {
            (StatusCode::CONFLICT, "ChangeConflictException")
        }
        StorageError::QueryExecution(_) => (StatusCode::BAD_REQUEST, "QueryExecutionException"),
        StorageError::ReadOnly => (StatusCode::FORBIDDEN, "ReadOnlyException"),
        StorageError::EmptyRepository => (StatusCode::NOT_FOUND, "EntryNotFoundException"),
        StorageError::Storage(_) | StorageError::Encryption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "StorageException")
        }
        StorageError::Core(_) => (StatusCode::BAD_REQUEST, "BadRequestException"),
    }
}
