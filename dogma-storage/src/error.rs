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

use crate::object::StoreError;
use dogma_core::CoreError;
use thiserror::Error;

/// Storage Backend error taxonomy (SPEC_FULL.md §4.A "Failure model" / §7).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("revision not found: {0}")]
    RevisionNotFound(i32),
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("change conflict: base revision is not head")]
    ChangeConflict,
    #[error("redundant change: commit would be a no-op")]
    RedundantChange,
    #[error("query execution error: {0}")]
    QueryExecution(String),
    #[error("repository is read-only")]
    ReadOnly,
    #[error("storage is empty")]
    EmptyRepository,
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("invalid input: {0}")]
    Core(#[from] CoreError),
    #[error("encryption error: {0}")]
    Encryption(String),
}
