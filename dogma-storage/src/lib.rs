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

//! The Storage Backend: content-addressed object storage, a per-repository
//! commit log, and the diff engine that reads it.

pub mod diff;
pub mod error;
pub mod log;
pub mod object;

pub use diff::{diff_entries, unified_diff, EntryDiff, TreeDiff};
pub use error::StorageError;
pub use log::{CommitLog, FindOptions, LogEntry};
pub use object::{Blob, ObjectId, ObjectStore, ObjectType, StoreError, StoreStats, StoredObject, Tree, TreeEntry};
