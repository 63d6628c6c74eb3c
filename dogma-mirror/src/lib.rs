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

//! The Mirror Scheduler (SPEC_FULL.md §4.D): a cron-driven ticker that
//! imports and exports repository content against remote Git endpoints,
//! gated by per-mirror access control and zone affinity.

pub mod access;
pub mod credential;
pub mod descriptor;
pub mod error;
pub mod gitignore;
pub mod local_to_remote;
pub mod remote_to_local;
pub mod scheduler;
pub mod state;
pub mod task;

pub use access::{AccessRule, MirrorAccessController};
pub use credential::{
    load_credential, list_sealed_credentials, project_credential_path, repo_credential_path, Credential,
    CredentialSecret, SealedCredential, PROJECT_CREDENTIAL_PATH_PATTERN, REPO_CREDENTIAL_PATH_PATTERN,
};
pub use descriptor::{Direction, MirrorDescriptor};
pub use error::MirrorError;
pub use gitignore::Gitignore;
pub use local_to_remote::sync_local_to_remote;
pub use remote_to_local::sync_remote_to_local;
pub use scheduler::{MirrorScheduler, MirrorSchedulerConfig, ACCESS_RULE_PATH_PATTERN, MIRROR_PATH_PATTERN};
pub use state::{MirrorState, STATE_FILE_PATH};
pub use task::{MirrorEvent, MirrorTask, TaskStatus};
