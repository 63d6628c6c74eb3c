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

//! Content-addressable object model: blobs and trees, keyed by the BLAKE3
//! hash of their serialized bytes (SPEC_FULL.md §4.A.1). Commit records
//! themselves live in `crate::log`, referencing a tree hash.

mod blob;
mod store;
mod tree;

pub use blob::Blob;
pub use store::{ObjectStore, StoreError, StoreStats};
pub use tree::{Tree, TreeEntry};

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Content address of a stored object: the BLAKE3 hash of its serialized
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    pub fn from_content(bytes: &[u8]) -> Self {
        ObjectId(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }

    pub fn from_hex(s: &str) -> Result<Self, StoreError> {
        let bytes = hex::decode(s).map_err(|_| StoreError::CorruptedObject)?;
        if bytes.len() != 32 {
            return Err(StoreError::CorruptedObject);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(ObjectId(arr))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Discriminator persisted alongside each stored object's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    Blob = 1,
    Tree = 2,
}

/// A type storable in the [`ObjectStore`]: serializes deterministically and
/// knows its own [`ObjectType`] and content address.
pub trait StoredObject: Sized + Serialize + DeserializeOwned {
    const TYPE: ObjectType;

    fn serialize_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("object serialization is infallible")
    }

    fn deserialize_bytes(data: &[u8]) -> Result<Self, StoreError> {
        bincode::deserialize(data).map_err(|_| StoreError::CorruptedObject)
    }

    fn compute_oid(&self) -> ObjectId {
        ObjectId::from_content(&self.serialize_bytes())
    }
}
