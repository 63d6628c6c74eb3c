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

//! `AppState` (SPEC_FULL.md §6.1): the handle every handler extracts via
//! `State<Arc<AppState>>` — the project registry is the executor itself
//! (it already owns project/repository lookups), plus the watch engine
//! and mirror scheduler handles and the auth context toggle.

use dogma_core::DogmaConfig;
use dogma_crypto::{BlobCipher, KekProvider};
use dogma_executor::CommandExecutor;
use dogma_mirror::MirrorScheduler;
use dogma_watch::WatchEngine;
use std::sync::Arc;

/// The reserved project backing server-wide (not per-project) metadata:
/// the mirror access-control rule list. It is created automatically at
/// startup alongside any user projects (SPEC_FULL.md §6 "`/mirror/access`
/// ... sys-admin").
pub const ACCESS_CONTROL_PROJECT: &str = "dogma-system";

/// Where the server-wide credential cipher's wrapped key is recorded,
/// inside the reserved system project's meta-repository.
pub const CREDENTIAL_KEY_PATH: &str = "/credential-key.json";

pub struct AppState {
    pub executor: Arc<CommandExecutor>,
    pub watch_engine: Arc<WatchEngine>,
    pub mirror_scheduler: Arc<MirrorScheduler>,
    pub kek_provider: Arc<dyn KekProvider>,
    pub credential_cipher: Arc<dyn BlobCipher>,
    pub config: DogmaConfig,
}
