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

use crate::commit::Author;
use serde::{Deserialize, Serialize};

/// The name reserved for every project's metadata repository (SPEC_FULL.md §6).
pub const META_REPOSITORY_NAME: &str = "dogma";

/// Lifecycle status of a repository or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryStatus {
    Active,
    ReadOnly,
    /// Tombstoned by a `RemoveRepository`/`DELETE` command; purgeable later.
    Removed,
}

/// A named container of repositories. Always has a reserved `dogma` meta
/// repository created alongside it, holding access policy, mirror
/// definitions, and credentials as ordinary JSON entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub creator: Author,
    pub created_at_millis: i64,
    pub status: RepositoryStatus,
}

impl Project {
    pub fn new(name: impl Into<String>, creator: Author, created_at_millis: i64) -> Self {
        Self {
            name: name.into(),
            creator,
            created_at_millis,
            status: RepositoryStatus::Active,
        }
    }
}

/// Repository metadata tracked alongside the commit log (name, status,
/// whether it is encrypted). The commit log itself lives in `dogma-storage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryMeta {
    pub name: String,
    pub creator: Author,
    pub created_at_millis: i64,
    pub status: RepositoryStatus,
    pub encrypted: bool,
}

impl RepositoryMeta {
    pub fn new(name: impl Into<String>, creator: Author, created_at_millis: i64) -> Self {
        Self {
            name: name.into(),
            creator,
            created_at_millis,
            status: RepositoryStatus::Active,
            encrypted: false,
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.status, RepositoryStatus::Active)
    }
}
