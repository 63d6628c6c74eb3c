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

//! The per-repository commit log and head tree (SPEC_FULL.md §4.A): an
//! append-only, strictly monotonic sequence of commits over a materialized
//! tree, with content-addressed storage underneath.

use crate::diff::{diff_entries, EntryDiff, TreeDiff};
use crate::error::StorageError;
use crate::object::{Blob, ObjectStore, Tree};
use dogma_core::{
    Author, Change, ChangeContent, Commit, CommitMessage, Entry, EntryContent, PathPattern,
    Revision,
};
use dogma_crypto::BlobCipher;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_HISTORY: usize = 1000;
const DEFAULT_HISTORY: usize = 100;

/// Options for [`CommitLog::find`] (SPEC_FULL.md §4.A "Find options").
#[derive(Debug, Clone, Copy)]
pub struct FindOptions {
    pub fetch_content: bool,
    pub max_entries: Option<usize>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            fetch_content: true,
            max_entries: None,
        }
    }
}

/// A single entry in `history()` output.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub revision: Revision,
    pub author: Author,
    pub when_millis: i64,
    pub message: CommitMessage,
    pub paths_changed: Vec<String>,
}

/// The head-tree-plus-history abstraction backing one repository. Not
/// `Send`-shared directly; callers hold it behind an `Arc<RwLock<..>>` (see
/// `dogma-executor`, which serializes all mutation through a single
/// applier per repository, matching SPEC_FULL.md §5).
pub struct CommitLog {
    store: RwLock<Arc<ObjectStore>>,
    commits: RwLock<Vec<Commit>>,
    trees: RwLock<Vec<Tree>>, // trees[i] is the tree *after* commits[i] (trees[0] is the empty tree before any commit)
    path: Option<PathBuf>,
    /// Set only for encrypted repositories (SPEC_FULL.md §4.E); when
    /// present, every blob written through `commit` is sealed with it and
    /// every blob read back is opened with it.
    cipher: RwLock<Option<Arc<dyn BlobCipher>>>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Arc::new(ObjectStore::new())),
            commits: RwLock::new(Vec::new()),
            trees: RwLock::new(vec![Tree::new()]),
            path: None,
            cipher: RwLock::new(None),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let mut log = Self::new();
        log.path = Some(path.into());
        log
    }

    pub fn store(&self) -> Arc<ObjectStore> {
        self.store.read().clone()
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.read().is_some()
    }

    fn seal(&self, plaintext: Vec<u8>) -> Vec<u8> {
        match self.cipher.read().as_ref() {
            Some(cipher) => cipher.encrypt(&plaintext),
            None => plaintext,
        }
    }

    fn open(&self, bytes: &[u8]) -> Result<Vec<u8>, StorageError> {
        match self.cipher.read().as_ref() {
            Some(cipher) => cipher
                .decrypt(bytes)
                .map_err(|e| StorageError::Encryption(e.to_string())),
            None => Ok(bytes.to_vec()),
        }
    }

    pub fn head(&self) -> i32 {
        self.commits.read().len() as i32
    }

    pub fn is_empty(&self) -> bool {
        self.commits.read().is_empty()
    }

    pub fn normalize(&self, rev: Revision) -> Result<Revision, StorageError> {
        rev.normalize(self.head())
            .map_err(|_| StorageError::RevisionNotFound(rev.value()))
    }

    /// SPEC_FULL.md §4.A "Commit algorithm".
    pub fn commit(
        &self,
        base: Revision,
        author: Author,
        message: CommitMessage,
        changes: Vec<Change>,
        direct_exec: bool,
    ) -> Result<Revision, StorageError> {
        let head = self.head();

        // Step 1: base revision must be current head (absolute head, not a
        // relative reference — a stale snapshot fails here).
        let base_abs = if base.value() < 0 {
            base.normalize(head)?.value()
        } else {
            base.value()
        };
        if head > 0 && base_abs != head {
            return Err(StorageError::ChangeConflict);
        }
        if head == 0 && base_abs != 0 {
            return Err(StorageError::ChangeConflict);
        }

        // Step 2: apply each change to a working copy of the head tree.
        let base_tree = self.trees.read()[head as usize].clone();
        let mut working = base_tree.clone();
        let mut paths_changed = Vec::new();
        for change in &changes {
            self.apply_change(&mut working, change)?;
            paths_changed.push(change.path.clone());
        }

        // Step 3: reject no-op commits unless this is a replicated apply.
        if working == base_tree && direct_exec {
            return Err(StorageError::RedundantChange);
        }

        // Step 4: persist the tree and commit record as one unit.
        let store = self.store.read();
        let tree_hash = store.put(&working);
        let parent_tree_hash = if head > 0 {
            Some(*store.put(&base_tree).as_bytes())
        } else {
            None
        };
        drop(store);
        let commit = Commit {
            revision: Revision::new(head + 1),
            author,
            when_millis: now_millis(),
            message,
            changes,
            tree_hash: *tree_hash.as_bytes(),
            parent_tree_hash,
        };

        self.commits.write().push(commit);
        self.trees.write().push(working);

        // Step 5 (notifying the Watch Engine) happens one layer up, in
        // `dogma-executor`, which owns the broadcast channel mediator
        // described in SPEC_FULL.md §9.
        Ok(Revision::new(head + 1))
    }

    fn apply_change(&self, tree: &mut Tree, change: &Change) -> Result<(), StorageError> {
        dogma_core::pattern::validate_path(&change.path).map_err(StorageError::Core)?;
        match &change.content {
            ChangeContent::Upsert(content) => {
                let bytes = self.seal(content.to_bytes().map_err(StorageError::Core)?);
                let blob = Blob::new(bytes, content.entry_type());
                let oid = self.store.read().put(&blob);
                tree.upsert(change.path.clone(), oid);
                Ok(())
            }
            ChangeContent::Remove => {
                if !tree.remove(&change.path) {
                    return Err(StorageError::EntryNotFound(change.path.clone()));
                }
                Ok(())
            }
            ChangeContent::JsonPatch(patch_value) => {
                let entry = tree
                    .get(&change.path)
                    .ok_or_else(|| StorageError::EntryNotFound(change.path.clone()))?;
                let blob: Blob = self.store.read().get(&entry.blob)?;
                if blob.entry_type != dogma_core::EntryType::Json
                    && blob.entry_type != dogma_core::EntryType::Yaml
                {
                    return Err(StorageError::QueryExecution(
                        "json patch requires a json/yaml target".to_string(),
                    ));
                }
                let plaintext = self.open(&blob.data)?;
                let mut content =
                    EntryContent::from_bytes(blob.entry_type, &plaintext).map_err(StorageError::Core)?;
                let json = content
                    .as_json()
                    .cloned()
                    .ok_or_else(|| StorageError::QueryExecution("not json".to_string()))?;
                let mut doc = json;
                let patch: json_patch::Patch =
                    serde_json::from_value(patch_value.clone()).map_err(|e| {
                        StorageError::QueryExecution(format!("invalid json patch: {e}"))
                    })?;
                json_patch::patch(&mut doc, &patch)
                    .map_err(|e| StorageError::QueryExecution(format!("patch failed: {e}")))?;
                content = match blob.entry_type {
                    dogma_core::EntryType::Yaml => EntryContent::Yaml(doc),
                    _ => EntryContent::Json(doc),
                };
                let new_bytes = self.seal(content.to_bytes().map_err(StorageError::Core)?);
                let new_blob = Blob::new(new_bytes, blob.entry_type);
                let oid = self.store.read().put(&new_blob);
                tree.upsert(change.path.clone(), oid);
                Ok(())
            }
            ChangeContent::TextPatch(unified) => {
                let entry = tree
                    .get(&change.path)
                    .ok_or_else(|| StorageError::EntryNotFound(change.path.clone()))?;
                let blob: Blob = self.store.read().get(&entry.blob)?;
                if blob.entry_type != dogma_core::EntryType::Text {
                    return Err(StorageError::QueryExecution(
                        "text patch requires a text target".to_string(),
                    ));
                }
                let plaintext = self.open(&blob.data)?;
                let old_text = EntryContent::from_bytes(blob.entry_type, &plaintext)
                    .map_err(StorageError::Core)?;
                let old_str = old_text.as_text().unwrap_or_default();
                let patched = crate::diff::apply_unified_diff(old_str, unified)?;
                let content = EntryContent::Text(patched);
                let new_bytes = self.seal(content.to_bytes().map_err(StorageError::Core)?);
                let new_blob = Blob::new(new_bytes, blob.entry_type);
                let oid = self.store.read().put(&new_blob);
                tree.upsert(change.path.clone(), oid);
                Ok(())
            }
        }
    }

    pub fn get(&self, rev: Revision, path: &str) -> Result<Entry, StorageError> {
        let abs = self.normalize(rev)?;
        let tree = &self.trees.read()[abs.value() as usize];
        let entry = tree
            .get(path)
            .ok_or_else(|| StorageError::EntryNotFound(path.to_string()))?;
        let blob: Blob = self.store.read().get(&entry.blob)?;
        let plaintext = self.open(&blob.data)?;
        let content = EntryContent::from_bytes(blob.entry_type, &plaintext).map_err(StorageError::Core)?;
        Ok(Entry::new(path.to_string(), content, abs))
    }

    pub fn find(
        &self,
        rev: Revision,
        pattern: &str,
        opts: FindOptions,
    ) -> Result<Vec<Entry>, StorageError> {
        if let Some(0) = opts.max_entries {
            return Err(StorageError::QueryExecution(
                "max_entries must be > 0".to_string(),
            ));
        }
        let abs = self.normalize(rev)?;
        let pattern = PathPattern::parse(pattern).map_err(StorageError::Core)?;
        let tree = &self.trees.read()[abs.value() as usize];
        let mut results = Vec::new();
        for entry in tree.iter() {
            if !pattern.matches(&entry.path) {
                continue;
            }
            let content = if opts.fetch_content {
                let blob: Blob = self.store.read().get(&entry.blob)?;
                let plaintext = self.open(&blob.data)?;
                EntryContent::from_bytes(blob.entry_type, &plaintext).map_err(StorageError::Core)?
            } else {
                EntryContent::Directory
            };
            results.push(Entry::new(entry.path.clone(), content, abs));
            if let Some(max) = opts.max_entries {
                if results.len() >= max {
                    break;
                }
            }
        }
        Ok(results)
    }

    /// SPEC_FULL.md §4.A "History": bounded list of commits touching a
    /// pattern, newest-first.
    pub fn history(
        &self,
        from: Revision,
        to: Revision,
        pattern: &str,
        max: Option<usize>,
    ) -> Result<Vec<LogEntry>, StorageError> {
        let head = self.head();
        if head == 0 {
            return Err(StorageError::EmptyRepository);
        }
        let mut from_abs = self.normalize(from)?.value();
        let mut to_abs = self.normalize(to)?.value();
        if from_abs > to_abs {
            std::mem::swap(&mut from_abs, &mut to_abs);
        }
        let pattern_matcher = PathPattern::parse(pattern).map_err(StorageError::Core)?;
        let max = max.unwrap_or(DEFAULT_HISTORY).min(MAX_HISTORY);

        let commits = self.commits.read();
        let mut results = Vec::new();
        for rev in (from_abs..=to_abs).rev() {
            let commit = &commits[(rev - 1) as usize];
            let touches = commit
                .changes
                .iter()
                .any(|c| pattern_matcher.matches(&c.path));
            // The genesis commit is always surfaced for an INIT..INIT query
            // even though it has no pattern-matching changes, so creation
            // metadata is derivable.
            if touches || rev == 1 {
                results.push(LogEntry {
                    revision: Revision::new(rev),
                    author: commit.author.clone(),
                    when_millis: commit.when_millis,
                    message: commit.message.clone(),
                    paths_changed: commit.changes.iter().map(|c| c.path.clone()).collect(),
                });
            }
            if results.len() >= max {
                break;
            }
        }
        Ok(results)
    }

    pub fn diff(&self, from: Revision, to: Revision) -> Result<TreeDiff, StorageError> {
        let from_abs = self.normalize(from)?;
        let to_abs = self.normalize(to)?;
        let from_tree = &self.trees.read()[from_abs.value() as usize];
        let to_tree = &self.trees.read()[to_abs.value() as usize];

        let mut diff = TreeDiff::default();
        let mut paths: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
        paths.extend(from_tree.iter().map(|e| e.path.as_str()));
        paths.extend(to_tree.iter().map(|e| e.path.as_str()));

        for path in paths {
            let old_entry = from_tree.get(path);
            let new_entry = to_tree.get(path);
            let old_content = old_entry
                .map(|e| self.store.read().get::<Blob>(&e.blob))
                .transpose()?
                .map(|b| -> Result<EntryContent, StorageError> {
                    let plaintext = self.open(&b.data)?;
                    EntryContent::from_bytes(b.entry_type, &plaintext).map_err(StorageError::Core)
                })
                .transpose()?;
            let new_content = new_entry
                .map(|e| self.store.read().get::<Blob>(&e.blob))
                .transpose()?
                .map(|b| -> Result<EntryContent, StorageError> {
                    let plaintext = self.open(&b.data)?;
                    EntryContent::from_bytes(b.entry_type, &plaintext).map_err(StorageError::Core)
                })
                .transpose()?;
            if let Some(d) = diff_entries(old_content.as_ref(), new_content.as_ref())? {
                diff.changes.insert(path.to_string(), d);
            }
        }
        Ok(diff)
    }

    /// The low-level primitive behind `watch`: the first revision strictly
    /// greater than `last_known_rev` whose changes intersect `pattern`, if
    /// any already exists.
    pub fn find_latest_revision(
        &self,
        last_known_rev: Revision,
        pattern: &str,
    ) -> Result<Option<Revision>, StorageError> {
        let head = self.head();
        let last_abs = if head == 0 {
            0
        } else {
            self.normalize(last_known_rev)?.value()
        };
        let pattern_matcher = PathPattern::parse(pattern).map_err(StorageError::Core)?;
        let commits = self.commits.read();
        for rev in (last_abs + 1)..=head {
            let commit = &commits[(rev - 1) as usize];
            if commit
                .changes
                .iter()
                .any(|c| pattern_matcher.matches(&c.path))
            {
                return Ok(Some(Revision::new(rev)));
            }
        }
        Ok(None)
    }

    pub fn save(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        std::fs::create_dir_all(path)?;
        self.store.read().save_to_file(path.join("objects.bin"))?;
        let commits = self.commits.read();
        let bytes = bincode::serialize(&*commits).map_err(|_| crate::object::StoreError::CorruptedObject)?;
        std::fs::write(path.join("commits.bin"), bytes)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = ObjectStore::load_from_file(path.join("objects.bin"))?;
        let bytes = std::fs::read(path.join("commits.bin"))?;
        let commits: Vec<Commit> =
            bincode::deserialize(&bytes).map_err(|_| crate::object::StoreError::CorruptedObject)?;

        // Rebuild trees by walking forward, replaying each commit's
        // recorded tree hash (the tree object itself is already in the
        // object store, only the in-memory vector needs reconstructing).
        let mut trees = vec![Tree::new()];
        for commit in &commits {
            let oid = crate::object::ObjectId::from_hex(&hex::encode(commit.tree_hash))
                .map_err(StorageError::Storage)?;
            let tree: Tree = store.get(&oid)?;
            trees.push(tree);
        }

        Ok(Self {
            store: RwLock::new(Arc::new(store)),
            commits: RwLock::new(commits),
            trees: RwLock::new(trees),
            path: Some(path.to_path_buf()),
            cipher: RwLock::new(None),
        })
    }

    /// Re-encrypts every blob reachable from the current head tree under
    /// `cipher`, rebuilding the object store and tree chain in place and
    /// swapping them in atomically (SPEC_FULL.md §4.E "Migration to
    /// encrypted"). Historical revisions, authors, timestamps and commit
    /// messages are preserved; only blob *content* at each tree is
    /// re-materialized, since the old store held it in plaintext and the
    /// new one must not. Returns an error and leaves the log untouched if
    /// it is already encrypted.
    pub fn migrate_to_encrypted(&self, cipher: Arc<dyn BlobCipher>) -> Result<(), StorageError> {
        if self.is_encrypted() {
            return Err(StorageError::Encryption(
                "repository is already encrypted".to_string(),
            ));
        }

        let old_store = self.store.read().clone();
        let old_trees = self.trees.read().clone();
        let new_store = ObjectStore::new();

        // trees[0] is always the empty tree and needs no re-sealing; its
        // hash is not referenced by any commit (the genesis commit's
        // `parent_tree_hash` is `None`, not the empty tree's hash).
        let mut new_trees = vec![Tree::new()];
        let mut new_tree_hashes = vec![[0u8; 32]];
        // Blobs are content-addressed on their (now differently-sealed)
        // bytes, so identical plaintext at different paths/revisions is
        // only ever re-encrypted once thanks to `put`'s own dedup.
        for tree in old_trees.iter().skip(1) {
            let mut rebuilt = Tree::new();
            for entry in tree.iter() {
                let blob: Blob = old_store.get(&entry.blob)?;
                let sealed = cipher.encrypt(&blob.data);
                let new_blob = Blob::new(sealed, blob.entry_type);
                let new_id = new_store.put(&new_blob);
                rebuilt.upsert(entry.path.clone(), new_id);
            }
            let tree_id = new_store.put(&rebuilt);
            new_tree_hashes.push(*tree_id.as_bytes());
            new_trees.push(rebuilt);
        }

        // The recorded tree hashes are content hashes of plaintext trees;
        // once the store holds only sealed blobs those hashes no longer
        // resolve, so every commit's hash pointers are rewritten in lock
        // step with the rebuilt store (revision order, author, timestamp
        // and message are untouched).
        let mut commits = self.commits.write();
        for (i, commit) in commits.iter_mut().enumerate() {
            commit.tree_hash = new_tree_hashes[i + 1];
            commit.parent_tree_hash = if i == 0 { None } else { Some(new_tree_hashes[i]) };
        }
        drop(commits);

        *self.store.write() = Arc::new(new_store);
        *self.trees.write() = new_trees;
        *self.cipher.write() = Some(cipher);
        Ok(())
    }
}

impl Default for CommitLog {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(path: &str, value: serde_json::Value) -> Change {
        Change::upsert(path, EntryContent::Json(value))
    }

    #[test]
    fn first_commit_is_revision_one() {
        let log = CommitLog::new();
        let rev = log
            .commit(
                Revision::new(0),
                Author::new("alice"),
                CommitMessage::summary_only("init"),
                vec![upsert("/a.json", serde_json::json!({"x": 1}))],
                true,
            )
            .unwrap();
        assert_eq!(rev, Revision::new(1));
    }

    #[test]
    fn stale_base_revision_conflicts() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();

        let err = log
            .commit(
                Revision::new(0),
                Author::new("bob"),
                CommitMessage::summary_only("conflict"),
                vec![upsert("/b.json", serde_json::json!(2))],
                true,
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::ChangeConflict));
    }

    #[test]
    fn redundant_change_is_rejected() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();

        let err = log
            .commit(
                Revision::new(1),
                Author::new("alice"),
                CommitMessage::summary_only("noop"),
                vec![upsert("/a.json", serde_json::json!(1))],
                true,
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::RedundantChange));
    }

    #[test]
    fn replicated_noop_is_materialized_not_rejected() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();

        let rev = log
            .commit(
                Revision::new(1),
                Author::new("alice"),
                CommitMessage::summary_only("replicated noop"),
                vec![upsert("/a.json", serde_json::json!(1))],
                false,
            )
            .unwrap();
        assert_eq!(rev, Revision::new(2));
    }

    #[test]
    fn commit_then_get_returns_the_content() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!({"x": 1}))],
            true,
        )
        .unwrap();

        let entry = log.get(Revision::HEAD, "/a.json").unwrap();
        assert_eq!(entry.content, EntryContent::Json(serde_json::json!({"x": 1})));
    }

    #[test]
    fn diff_of_same_revision_is_empty() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();
        let diff = log.diff(Revision::new(1), Revision::new(1)).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn find_latest_revision_respects_pattern() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();
        log.commit(
            Revision::new(1),
            Author::new("alice"),
            CommitMessage::summary_only("unrelated"),
            vec![upsert("/b.json", serde_json::json!(2))],
            true,
        )
        .unwrap();

        assert_eq!(
            log.find_latest_revision(Revision::new(1), "/a.json").unwrap(),
            None
        );
        assert_eq!(
            log.find_latest_revision(Revision::new(1), "/b.json").unwrap(),
            Some(Revision::new(2))
        );
    }

    #[test]
    fn history_includes_genesis_for_init_query() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();
        let entries = log
            .history(Revision::INIT, Revision::INIT, "/nonexistent.json", None)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].revision, Revision::new(1));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::with_path(dir.path());
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!({"x": 1}))],
            true,
        )
        .unwrap();
        log.save().unwrap();

        let loaded = CommitLog::load(dir.path()).unwrap();
        assert_eq!(loaded.head(), 1);
        let entry = loaded.get(Revision::HEAD, "/a.json").unwrap();
        assert_eq!(entry.content, EntryContent::Json(serde_json::json!({"x": 1})));
    }

    #[test]
    fn migrate_to_encrypted_preserves_content_and_history() {
        use dogma_crypto::DekCipher;

        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!({"x": 1}))],
            true,
        )
        .unwrap();
        log.commit(
            Revision::new(1),
            Author::new("bob"),
            CommitMessage::summary_only("second"),
            vec![upsert("/b.json", serde_json::json!({"y": 2}))],
            true,
        )
        .unwrap();

        assert!(!log.is_encrypted());
        let cipher: Arc<dyn BlobCipher> = Arc::new(DekCipher::new(DekCipher::generate()));
        log.migrate_to_encrypted(cipher).unwrap();
        assert!(log.is_encrypted());

        assert_eq!(
            log.get(Revision::HEAD, "/a.json").unwrap().content,
            EntryContent::Json(serde_json::json!({"x": 1}))
        );
        assert_eq!(
            log.get(Revision::HEAD, "/b.json").unwrap().content,
            EntryContent::Json(serde_json::json!({"y": 2}))
        );
        let history = log
            .history(Revision::INIT, Revision::HEAD, "/**", None)
            .unwrap();
        assert_eq!(history.len(), 2);

        // The underlying store no longer holds plaintext bytes anywhere.
        let stats = log.store().stats();
        assert_eq!(stats.blob_count, 2);
    }

    #[test]
    fn migrating_an_already_encrypted_log_is_rejected() {
        use dogma_crypto::DekCipher;

        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![upsert("/a.json", serde_json::json!(1))],
            true,
        )
        .unwrap();
        let cipher: Arc<dyn BlobCipher> = Arc::new(DekCipher::new(DekCipher::generate()));
        log.migrate_to_encrypted(cipher.clone()).unwrap();
        assert!(matches!(
            log.migrate_to_encrypted(cipher),
            Err(StorageError::Encryption(_))
        ));
    }
}
