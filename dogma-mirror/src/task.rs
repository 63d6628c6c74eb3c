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

//! One run of one [`crate::MirrorDescriptor`] (SPEC_FULL.md §4.D "Lifecycle
//! events"): observers receive `onStart`/`onComplete`/`onError` plus
//! descriptor CRUD events, all folded here into one [`MirrorEvent`] stream
//! so `dogma-server` can expose a single subscription for the mirror status
//! page.

use serde::{Deserialize, Serialize};

/// The outcome recorded on a completed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success { description: String },
    NoOp { description: String },
    Failure { description: String },
}

impl TaskStatus {
    pub fn description(&self) -> &str {
        match self {
            TaskStatus::Success { description }
            | TaskStatus::NoOp { description }
            | TaskStatus::Failure { description } => description,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failure { .. })
    }
}

/// Identifies one scheduler tick's attempt to run one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTask {
    pub mirror_id: String,
    pub project: String,
    pub started_at_millis: i64,
}

/// Everything an observer (SPEC_FULL.md §4.D, the status page in
/// `dogma-server`) might want to know about the scheduler's activity.
#[derive(Debug, Clone)]
pub enum MirrorEvent {
    Started(MirrorTask),
    Completed(MirrorTask, TaskStatus),
    Error(MirrorTask, String),
    Disallowed(MirrorTask, String),
}
