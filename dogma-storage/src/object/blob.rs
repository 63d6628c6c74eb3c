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

use super::{ObjectType, StoredObject};
use dogma_core::EntryType;
use serde::{Deserialize, Serialize};

/// The raw bytes of one entry, plus the entry type needed to decode them
/// back into `EntryContent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
    pub entry_type: EntryType,
}

impl Blob {
    pub fn new(data: Vec<u8>, entry_type: EntryType) -> Self {
        Self { data, entry_type }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StoredObject for Blob {
    const TYPE: ObjectType = ObjectType::Blob;
}
