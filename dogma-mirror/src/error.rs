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

use dogma_executor::ExecutorError;
use dogma_storage::StorageError;
use thiserror::Error;

/// Mirror Scheduler error taxonomy (SPEC_FULL.md §4.D / §7).
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror not found: {0}")]
    NotFound(String),
    #[error("invalid cron expression: {0}")]
    InvalidSchedule(String),
    #[error("invalid zone hint: {0}")]
    InvalidZone(String),
    #[error("remote uri disallowed by access control: {0}")]
    Disallowed(String),
    #[error("remote rejected the push (non-fast-forward)")]
    NonFastForward,
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed mirror state: {0}")]
    CorruptState(String),
    #[error("credential not found: {0}")]
    CredentialNotFound(String),
}
