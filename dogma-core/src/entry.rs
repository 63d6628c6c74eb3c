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

use crate::error::CoreError;
use crate::revision::Revision;
use serde::{Deserialize, Serialize};

/// The kind of content an [`Entry`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Json,
    Yaml,
    Text,
    /// Never stored directly; produced while enumerating a path pattern.
    Directory,
}

/// The content of an [`Entry`]. JSON and YAML both normalize to a
/// `serde_json::Value` tree internally (see SPEC_FULL.md §3.1) so diff and
/// patch share one code path; the original encoding is recovered only at
/// the storage/wire boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryContent {
    Json(serde_json::Value),
    Yaml(serde_json::Value),
    Text(String),
    Directory,
}

impl EntryContent {
    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryContent::Json(_) => EntryType::Json,
            EntryContent::Yaml(_) => EntryType::Yaml,
            EntryContent::Text(_) => EntryType::Text,
            EntryContent::Directory => EntryType::Directory,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            EntryContent::Json(v) | EntryContent::Yaml(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntryContent::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Serializes to the bytes that would be stored as the blob for this
    /// entry (UTF-8 JSON / YAML / plain text).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        match self {
            EntryContent::Json(v) => Ok(serde_json::to_vec_pretty(v)?),
            EntryContent::Yaml(v) => Ok(serde_yaml::to_string(v)?.into_bytes()),
            EntryContent::Text(s) => Ok(s.clone().into_bytes()),
            EntryContent::Directory => Ok(Vec::new()),
        }
    }

    pub fn from_bytes(entry_type: EntryType, bytes: &[u8]) -> Result<Self, CoreError> {
        match entry_type {
            EntryType::Json => {
                let v: serde_json::Value = serde_json::from_slice(bytes)?;
                Ok(EntryContent::Json(v))
            }
            EntryType::Yaml => {
                let v: serde_json::Value = serde_yaml::from_slice(bytes)?;
                Ok(EntryContent::Yaml(v))
            }
            EntryType::Text => {
                let s = String::from_utf8_lossy(bytes).into_owned();
                Ok(EntryContent::Text(s))
            }
            EntryType::Directory => Ok(EntryContent::Directory),
        }
    }
}

/// A single path/content pair as seen at a given revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub content: EntryContent,
    pub revision: Revision,
}

impl Entry {
    pub fn new(path: impl Into<String>, content: EntryContent, revision: Revision) -> Self {
        Self {
            path: path.into(),
            content,
            revision,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.content.entry_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_through_bytes() {
        let content = EntryContent::Json(serde_json::json!({"x": 1}));
        let bytes = content.to_bytes().unwrap();
        let back = EntryContent::from_bytes(EntryType::Json, &bytes).unwrap();
        assert_eq!(content, back);
    }

    #[test]
    fn text_round_trips_through_bytes() {
        let content = EntryContent::Text("hello\nworld\n".to_string());
        let bytes = content.to_bytes().unwrap();
        let back = EntryContent::from_bytes(EntryType::Text, &bytes).unwrap();
        assert_eq!(content, back);
    }
}
