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

use dogma_storage::StorageError;
use thiserror::Error;

/// Command Executor error taxonomy (SPEC_FULL.md §4.B / §7).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("repository not found: {0}/{1}")]
    RepositoryNotFound(String, String),
    #[error("project already exists: {0}")]
    ProjectAlreadyExists(String),
    #[error("repository already exists: {0}/{1}")]
    RepositoryAlreadyExists(String, String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("repository is read-only: {0}/{1}")]
    ReadOnly(String, String),
    #[error("server is not writable")]
    ServerNotWritable,
    #[error("server is stopping")]
    ServerStopping,
    #[error("status update is a no-op")]
    NotModified,
    #[error("replication error: {0}")]
    Replication(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ExecutorError {
    /// Whether this error represents a conflict in the §7 taxonomy
    /// (change conflict / already-exists), as opposed to not-found or
    /// validation errors the caller might retry differently.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ExecutorError::ProjectAlreadyExists(_)
                | ExecutorError::RepositoryAlreadyExists(_, _)
                | ExecutorError::Storage(StorageError::ChangeConflict)
                | ExecutorError::Storage(StorageError::RedundantChange)
        )
    }
}
