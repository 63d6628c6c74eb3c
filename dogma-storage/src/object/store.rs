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
use dashmap::DashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error("stored object is corrupted")]
    CorruptedObject,
    #[error("object type mismatch: expected {expected:?}, found {actual:?}")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

struct StoredEntry {
    obj_type: ObjectType,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_objects: u64,
    pub blob_count: u64,
    pub tree_count: u64,
    pub total_size_bytes: u64,
}

/// A deduplicating, content-addressable store of blobs and trees, shared
/// across every revision of a repository (SPEC_FULL.md §4.A.1).
pub struct ObjectStore {
    objects: DashMap<ObjectId, StoredEntry>,
    blob_count: AtomicU64,
    tree_count: AtomicU64,
    total_size: AtomicU64,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            blob_count: AtomicU64::new(0),
            tree_count: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
        }
    }

    /// Stores `obj`, skipping the write entirely if identical content is
    /// already present (dedup on hash).
    pub fn put<T: StoredObject>(&self, obj: &T) -> ObjectId {
        let bytes = obj.serialize_bytes();
        let oid = ObjectId::from_content(&bytes);
        if self.objects.contains_key(&oid) {
            return oid;
        }
        let size = bytes.len() as u64;
        self.objects.insert(
            oid,
            StoredEntry {
                obj_type: T::TYPE,
                data: bytes,
            },
        );
        match T::TYPE {
            ObjectType::Blob => {
                self.blob_count.fetch_add(1, Ordering::Relaxed);
            }
            ObjectType::Tree => {
                self.tree_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.total_size.fetch_add(size, Ordering::Relaxed);
        oid
    }

    pub fn get<T: StoredObject>(&self, oid: &ObjectId) -> Result<T, StoreError> {
        let entry = self.objects.get(oid).ok_or(StoreError::NotFound)?;
        if entry.obj_type != T::TYPE {
            return Err(StoreError::TypeMismatch {
                expected: T::TYPE,
                actual: entry.obj_type,
            });
        }
        T::deserialize_bytes(&entry.data)
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.objects.contains_key(oid)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_objects: self.objects.len() as u64,
            blob_count: self.blob_count.load(Ordering::Relaxed),
            tree_count: self.tree_count.load(Ordering::Relaxed),
            total_size_bytes: self.total_size.load(Ordering::Relaxed),
        }
    }

    /// Persists the full object table to `path` as a bincode-serialized
    /// `Vec<(ObjectId, ObjectType, Vec<u8>)>`.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let snapshot: Vec<(ObjectId, u8, Vec<u8>)> = self
            .objects
            .iter()
            .map(|e| (*e.key(), e.value().obj_type as u8, e.value().data.clone()))
            .collect();
        let bytes =
            bincode::serialize(&snapshot).map_err(|_| StoreError::CorruptedObject)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path)?;
        let snapshot: Vec<(ObjectId, u8, Vec<u8>)> =
            bincode::deserialize(&bytes).map_err(|_| StoreError::CorruptedObject)?;
        let store = Self::new();
        for (oid, type_tag, data) in snapshot {
            let obj_type = match type_tag {
                1 => ObjectType::Blob,
                2 => ObjectType::Tree,
                _ => return Err(StoreError::CorruptedObject),
            };
            let size = data.len() as u64;
            store.objects.insert(oid, StoredEntry { obj_type, data });
            match obj_type {
                ObjectType::Blob => {
                    store.blob_count.fetch_add(1, Ordering::Relaxed);
                }
                ObjectType::Tree => {
                    store.tree_count.fetch_add(1, Ordering::Relaxed);
                }
            }
            store.total_size.fetch_add(size, Ordering::Relaxed);
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Blob;
    use dogma_core::EntryType;

    #[test]
    fn put_dedups_identical_content() {
        let store = ObjectStore::new();
        let a = Blob::new(b"hello".to_vec(), EntryType::Text);
        let b = Blob::new(b"hello".to_vec(), EntryType::Text);
        let oid_a = store.put(&a);
        let oid_b = store.put(&b);
        assert_eq!(oid_a, oid_b);
        assert_eq!(store.stats().blob_count, 1);
    }

    #[test]
    fn get_type_mismatch_is_reported() {
        use crate::object::Tree;
        let store = ObjectStore::new();
        let blob = Blob::new(b"x".to_vec(), EntryType::Text);
        let oid = store.put(&blob);
        let err = store.get::<Tree>(&oid).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.bin");
        let store = ObjectStore::new();
        let blob = Blob::new(b"persisted".to_vec(), EntryType::Text);
        let oid = store.put(&blob);
        store.save_to_file(&path).unwrap();

        let loaded = ObjectStore::load_from_file(&path).unwrap();
        let back: Blob = loaded.get(&oid).unwrap();
        assert_eq!(back, blob);
    }
}
