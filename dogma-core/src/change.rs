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

use crate::entry::EntryContent;
use serde::{Deserialize, Serialize};

/// A proposed mutation of a single path, submitted as part of a [`crate::Commit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    pub content: ChangeContent,
}

impl Change {
    pub fn upsert(path: impl Into<String>, content: EntryContent) -> Self {
        Self {
            path: path.into(),
            content: ChangeContent::Upsert(content),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: ChangeContent::Remove,
        }
    }
}

/// Typed content of a [`Change`]. JSON-patch operations follow RFC 6902;
/// text patches follow the unified-diff hunk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeContent {
    Upsert(EntryContent),
    Remove,
    JsonPatch(serde_json::Value),
    TextPatch(String),
}
