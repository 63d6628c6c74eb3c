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

//! The Command Executor (SPEC_FULL.md §4.B): a single-producer,
//! multi-consumer log that linearizes every mutation — project/repository
//! lifecycle, pushes, server-status changes, encryption migration — through
//! one `ReplicationLog` and a single applier task per process.

pub mod command;
pub mod error;
pub mod executor;
pub mod replication;

pub use command::{Command, CommandOutcome, CommandPayload, CommandTarget, StatusScope};
pub use error::ExecutorError;
pub use executor::{CommandExecutor, CommitEvent};
pub use replication::{LocalReplicationLog, ReplicationLog, SequenceNo};
