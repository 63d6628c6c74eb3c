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

use thiserror::Error;

/// Errors raised by the data-model layer: malformed paths, invalid
/// revisions, and content that does not match its declared entry type.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("revision not found: {0}")]
    RevisionNotFound(i32),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    #[error("content does not match entry type {0:?}")]
    TypeMismatch(crate::entry::EntryType),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}
