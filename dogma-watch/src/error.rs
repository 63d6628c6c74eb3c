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

use dogma_storage::StorageError;
use thiserror::Error;

/// Watch Engine error taxonomy (SPEC_FULL.md §4.C / §7).
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watch timed out (or the owning repository was removed while
    /// parked); the HTTP binding maps this to `304` for a timeout and a
    /// `5xx` if cancellation was caused by shutdown (SPEC_FULL.md §7).
    #[error("watch cancelled")]
    Cancelled,
    #[error("repository not found: {0}/{1}")]
    RepositoryNotFound(String, String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
