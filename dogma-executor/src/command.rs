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

//! The unit of mutation the executor linearizes (SPEC_FULL.md §4.B): every
//! create/remove of a project or repository, every push, every
//! server-status change and every encryption migration is packaged as one
//! of these before it reaches the replication log.

use dogma_core::{Author, Change, CommitMessage, Revision};
use serde::{Deserialize, Serialize};

/// What a [`Command`] is targeted at: a project, optionally narrowed to one
/// of its repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTarget {
    pub project: String,
    pub repo: Option<String>,
}

impl CommandTarget {
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: None,
        }
    }

    pub fn repository(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: Some(repo.into()),
        }
    }

    pub fn repo_name(&self) -> Option<&str> {
        self.repo.as_deref()
    }
}

/// Scope of a server-status update: `Local` touches only this node, `All`
/// replicates the change to every node (SPEC_FULL.md §4.B "Scope of status
/// updates").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusScope {
    Local,
    All,
}

/// The typed payload of a [`Command`]; the discriminant doubles as the
/// `type` field the spec calls for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandPayload {
    CreateProject,
    RemoveProject,
    UnremoveProject,
    CreateRepository { encrypt: bool },
    RemoveRepository,
    UnremoveRepository,
    PurgeRepository,
    Push {
        base_revision: Revision,
        message: CommitMessage,
        changes: Vec<Change>,
    },
    UpdateServerStatus { writable: bool, replicating: bool },
    MigrateEncrypted,
}

impl CommandPayload {
    pub fn name(&self) -> &'static str {
        match self {
            CommandPayload::CreateProject => "CREATE_PROJECT",
            CommandPayload::RemoveProject => "REMOVE_PROJECT",
            CommandPayload::UnremoveProject => "UNREMOVE_PROJECT",
            CommandPayload::CreateRepository { .. } => "CREATE_REPOSITORY",
            CommandPayload::RemoveRepository => "REMOVE_REPOSITORY",
            CommandPayload::UnremoveRepository => "UNREMOVE_REPOSITORY",
            CommandPayload::PurgeRepository => "PURGE_REPOSITORY",
            CommandPayload::Push { .. } => "PUSH",
            CommandPayload::UpdateServerStatus { .. } => "UPDATE_SERVER_STATUS",
            CommandPayload::MigrateEncrypted => "MIGRATE_ENCRYPTED",
        }
    }
}

/// A single mutation, as proposed to the [`crate::ReplicationLog`] and later
/// applied by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub timestamp_millis: i64,
    pub author: Author,
    pub target: CommandTarget,
    pub payload: CommandPayload,
    /// Correlates a command with the oneshot result channel its proposer
    /// registered locally. Never serialized — a real, networked
    /// `ReplicationLog` carries only the fields above across nodes; this
    /// one is meaningless to any replica other than the one that proposed
    /// it, which is always true of a single-node executor.
    #[serde(skip)]
    pub correlation: Option<u64>,
}

impl Command {
    pub fn new(author: Author, target: CommandTarget, payload: CommandPayload) -> Self {
        Self {
            timestamp_millis: chrono::Utc::now().timestamp_millis(),
            author,
            target,
            payload,
            correlation: None,
        }
    }
}

/// The result of successfully applying a [`Command`], returned to the
/// caller that proposed it.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    ProjectCreated,
    ProjectRemoved,
    ProjectUnremoved,
    RepositoryCreated,
    RepositoryRemoved,
    RepositoryUnremoved,
    RepositoryPurged,
    Pushed(Revision),
    ServerStatusUpdated,
    MigratedEncrypted,
}
