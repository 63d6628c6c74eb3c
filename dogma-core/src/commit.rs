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

use crate::change::Change;
use crate::revision::Revision;
use serde::{Deserialize, Serialize};

/// The author of a commit, project, or repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: Some(email.into()),
        }
    }

    /// The author recorded on system-generated commits (mirror sync,
    /// migrations) rather than ones issued by an end user.
    pub fn system(name: &str) -> Self {
        Self {
            name: name.to_string(),
            email: None,
        }
    }
}

/// Typed detail of a [`CommitMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "markup", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitDetail {
    Markdown(String),
    Plaintext(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<CommitDetail>,
}

impl CommitMessage {
    pub fn summary_only(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: None,
        }
    }
}

/// A committed set of changes producing a new revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub revision: Revision,
    pub author: Author,
    pub when_millis: i64,
    pub message: CommitMessage,
    pub changes: Vec<Change>,
    /// Hash of the materialized tree at this revision, as recorded by the
    /// object storage layer (SPEC_FULL.md §4.A.1).
    pub tree_hash: [u8; 32],
    pub parent_tree_hash: Option<[u8; 32]>,
}

impl Commit {
    pub fn is_initial(&self) -> bool {
        self.parent_tree_hash.is_none()
    }
}
