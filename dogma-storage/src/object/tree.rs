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

use super::{ObjectId, ObjectType, StoredObject};
use serde::{Deserialize, Serialize};

/// One path and its blob in a [`Tree`]. Paths are full absolute entry paths
/// rather than single path segments — the per-revision tree is flat (the
/// data model has no real directory objects, only implicit ones produced
/// while enumerating a pattern), which keeps commit application a single
/// sorted-vector operation instead of a recursive tree walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub blob: ObjectId,
}

/// The full set of paths present at one revision, sorted by path for
/// deterministic hashing and diffing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Inserts or replaces the entry for `path`, keeping entries sorted.
    pub fn upsert(&mut self, path: String, blob: ObjectId) {
        match self.entries.binary_search_by(|e| e.path.cmp(&path)) {
            Ok(i) => self.entries[i].blob = blob,
            Err(i) => self.entries.insert(i, TreeEntry { path, blob }),
        }
    }

    /// Removes the entry for `path`, returning whether it was present.
    pub fn remove(&mut self, path: &str) -> bool {
        match self.entries.binary_search_by(|e| e.path.as_str().cmp(path)) {
            Ok(i) => {
                self.entries.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StoredObject for Tree {
    const TYPE: ObjectType = ObjectType::Tree;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> ObjectId {
        ObjectId::from_content(&[n])
    }

    #[test]
    fn upsert_keeps_sorted_order() {
        let mut t = Tree::new();
        t.upsert("/b.json".into(), oid(1));
        t.upsert("/a.json".into(), oid(2));
        t.upsert("/c.json".into(), oid(3));
        let paths: Vec<_> = t.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/a.json", "/b.json", "/c.json"]);
    }

    #[test]
    fn upsert_replaces_existing() {
        let mut t = Tree::new();
        t.upsert("/a.json".into(), oid(1));
        t.upsert("/a.json".into(), oid(2));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("/a.json").unwrap().blob, oid(2));
    }

    #[test]
    fn remove_reports_presence() {
        let mut t = Tree::new();
        t.upsert("/a.json".into(), oid(1));
        assert!(t.remove("/a.json"));
        assert!(!t.remove("/a.json"));
    }
}
