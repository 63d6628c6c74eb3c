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

//! The Mirror Scheduler (SPEC_FULL.md §4.D "Scheduler loop"): a
//! single-threaded ticker that lists mirror descriptors out of every
//! project's meta-repository, computes due mirrors from their cron
//! expressions, and submits them to a bounded worker pool gated by a
//! semaphore — acquiring a permit suspends the ticker itself when the pool
//! is saturated, so backpressure blocks scheduling rather than growing an
//! unbounded queue (SPEC_FULL.md §5 "zero-capacity hand-off").

use crate::access::{AccessRule, MirrorAccessController};
use crate::credential::load_credential;
use crate::descriptor::{Direction, MirrorDescriptor};
use crate::local_to_remote::sync_local_to_remote;
use crate::remote_to_local::sync_remote_to_local;
use crate::task::{MirrorEvent, MirrorTask, TaskStatus};
use chrono::{DateTime, TimeZone, Utc};
use dashmap::{DashMap, DashSet};
use dogma_core::{Revision, META_REPOSITORY_NAME};
use dogma_crypto::BlobCipher;
use dogma_executor::CommandExecutor;
use dogma_storage::FindOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tracing::{info, warn};

pub const MIRROR_PATH_PATTERN: &str = "/mirrors/*.json";
/// Access rules live in a single, project-independent meta-repository
/// (SPEC_FULL.md §6 "`GET/POST/PUT/DELETE /mirror/access[/{id}]`" — a
/// sys-admin-scoped, server-wide resource, unlike every other meta-repo
/// path which is per-project).
pub const ACCESS_RULE_PATH_PATTERN: &str = "/mirror-access-control/*.json";

pub struct MirrorSchedulerConfig {
    pub worker_pool_size: usize,
    pub tick_interval: Duration,
    pub max_num_files: usize,
    pub max_num_bytes: u64,
    pub scratch_dir: PathBuf,
    /// This node's zone, if zone-aware deployment is configured.
    pub current_zone: Option<String>,
    /// Every zone declared for the deployment; empty means zoning is off.
    pub declared_zones: Vec<String>,
    /// The project whose meta-repository holds the server-wide access
    /// rule list.
    pub access_control_project: String,
    /// Unseals credential entries resolved by `credential_id` (SPEC_FULL.md
    /// §2 "D ... uses E for stored credentials").
    pub credential_cipher: Arc<dyn BlobCipher>,
}

pub struct MirrorScheduler {
    executor: Arc<CommandExecutor>,
    config: MirrorSchedulerConfig,
    events: broadcast::Sender<MirrorEvent>,
    worker_permits: Arc<Semaphore>,
    closing: Arc<AtomicBool>,
    running: Arc<DashSet<String>>,
    last_fired_millis: DashMap<String, i64>,
}

impl MirrorScheduler {
    pub fn new(executor: Arc<CommandExecutor>, config: MirrorSchedulerConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let worker_permits = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Arc::new(Self {
            executor,
            config,
            events,
            worker_permits,
            closing: Arc::new(AtomicBool::new(false)),
            running: Arc::new(DashSet::new()),
            last_fired_millis: DashMap::new(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MirrorEvent> {
        self.events.subscribe()
    }

    /// Starts the single-threaded ticker (SPEC_FULL.md §4.D "fires every
    /// second").
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.tick_interval);
            loop {
                ticker.tick().await;
                if this.closing.load(Ordering::SeqCst) {
                    break;
                }
                this.tick(Utc::now()).await;
            }
        })
    }

    /// SPEC_FULL.md §4.D "Shutdown": sets `closing`, waits up to 10s for
    /// active tasks, then returns regardless (in-flight commits either
    /// complete or are rolled back at the storage layer, not here).
    pub async fn stop(&self) {
        self.closing.store(true, Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while !self.running.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if !self.running.is_empty() {
            warn!(
                remaining = self.running.len(),
                "mirror scheduler shutdown grace period elapsed with tasks still active"
            );
        }
    }

    async fn tick(self: &Arc<Self>, now: DateTime<Utc>) {
        let access = match self.load_access_control() {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "failed to load mirror access control, denying all mirrors this tick");
                MirrorAccessController::new(Vec::new())
            }
        };
        for project in self.executor.project_names() {
            let descriptors = match self.list_entries::<MirrorDescriptor>(&project, MIRROR_PATH_PATTERN) {
                Ok(d) => d,
                Err(e) => {
                    warn!(project = %project, error = %e, "failed to list mirror descriptors");
                    continue;
                }
            };
            for descriptor in descriptors {
                self.maybe_run(&project, descriptor, now, &access).await;
            }
        }
    }

    /// Reloads the server-wide access rule list fresh on every tick, the
    /// same way mirror descriptors are reloaded, so a rule change made
    /// through the HTTP binding takes effect on the next tick rather than
    /// only after a restart.
    fn load_access_control(&self) -> Result<MirrorAccessController, crate::error::MirrorError> {
        let rules = self.list_entries::<AccessRule>(&self.config.access_control_project, ACCESS_RULE_PATH_PATTERN)?;
        Ok(MirrorAccessController::new(rules))
    }

    fn list_entries<T: serde::de::DeserializeOwned>(
        &self,
        project: &str,
        pattern: &str,
    ) -> Result<Vec<T>, crate::error::MirrorError> {
        let log = self.executor.commit_log(project, META_REPOSITORY_NAME)?;
        if log.is_empty() {
            return Ok(Vec::new());
        }
        let entries = log.find(
            Revision::HEAD,
            pattern,
            FindOptions {
                fetch_content: true,
                max_entries: None,
            },
        )?;
        let mut parsed = Vec::new();
        for entry in entries {
            let Some(json) = entry.content.as_json() else {
                continue;
            };
            match serde_json::from_value::<T>(json.clone()) {
                Ok(v) => parsed.push(v),
                Err(e) => warn!(path = %entry.path, error = %e, "malformed meta-repository entry"),
            }
        }
        Ok(parsed)
    }

    async fn maybe_run(
        self: &Arc<Self>,
        project: &str,
        descriptor: MirrorDescriptor,
        now: DateTime<Utc>,
        access: &MirrorAccessController,
    ) {
        if !descriptor.enabled || self.running.contains(&descriptor.id) {
            return;
        }

        let task = MirrorTask {
            mirror_id: descriptor.id.clone(),
            project: project.to_string(),
            started_at_millis: now.timestamp_millis(),
        };

        match self.zone_check(&descriptor) {
            ZoneDecision::NotOurZone => return,
            ZoneDecision::Invalid(hint) => {
                let _ = self.events.send(MirrorEvent::Error(
                    task,
                    format!("invalid zone hint: {hint}"),
                ));
                return;
            }
            ZoneDecision::Ours => {}
        }

        if !self.is_due(&descriptor, now) {
            return;
        }

        if !access.is_allowed(&descriptor.remote_uri) {
            let _ = self.events.send(MirrorEvent::Disallowed(
                task,
                descriptor.remote_uri.clone(),
            ));
            return;
        }

        let permits = Arc::clone(&self.worker_permits);
        let Ok(permit) = permits.acquire_owned().await else {
            return;
        };

        self.running.insert(descriptor.id.clone());
        let _ = self.events.send(MirrorEvent::Started(task.clone()));

        let credential = match &descriptor.credential_id {
            Some(id) => match load_credential(
                &self.executor,
                self.config.credential_cipher.as_ref(),
                project,
                &descriptor.local_repo,
                id,
            ) {
                Ok(c) => Some(c),
                Err(e) => {
                    self.running.remove(&descriptor.id);
                    let _ = self
                        .events
                        .send(MirrorEvent::Error(task, format!("credential resolution failed: {e}")));
                    return;
                }
            },
            None => None,
        };

        let executor = Arc::clone(&self.executor);
        let events = self.events.clone();
        let running = Arc::clone(&self.running);
        let scratch_dir = self.config.scratch_dir.clone();
        let max_num_files = self.config.max_num_files;
        let max_num_bytes = self.config.max_num_bytes;
        let project = project.to_string();

        tokio::spawn(async move {
            let _permit = permit;
            let result = match descriptor.direction {
                Direction::RemoteToLocal => {
                    sync_remote_to_local(
                        Arc::clone(&executor),
                        project.clone(),
                        descriptor.clone(),
                        credential,
                        scratch_dir,
                        max_num_files,
                        max_num_bytes,
                    )
                    .await
                }
                Direction::LocalToRemote => {
                    sync_local_to_remote(
                        Arc::clone(&executor),
                        project.clone(),
                        descriptor.clone(),
                        credential,
                        scratch_dir,
                    )
                    .await
                }
            };
            match result {
                Ok(status) => {
                    info!(mirror = %descriptor.id, status = ?status, "mirror task completed");
                    let _ = events.send(MirrorEvent::Completed(task, status));
                }
                Err(e) => {
                    warn!(mirror = %descriptor.id, error = %e, "mirror task failed");
                    let _ = events.send(MirrorEvent::Completed(
                        task,
                        TaskStatus::Failure {
                            description: e.to_string(),
                        },
                    ));
                }
            }
            running.remove(&descriptor.id);
        });
    }

    fn zone_check(&self, descriptor: &MirrorDescriptor) -> ZoneDecision {
        let Some(hint) = descriptor
            .zone_hint
            .clone()
            .or_else(|| self.config.declared_zones.first().cloned())
        else {
            return ZoneDecision::Ours;
        };
        if !self.config.declared_zones.is_empty() && !self.config.declared_zones.contains(&hint) {
            return ZoneDecision::Invalid(hint);
        }
        match &self.config.current_zone {
            Some(current) if current != &hint => ZoneDecision::NotOurZone,
            _ => ZoneDecision::Ours,
        }
    }

    /// Computes whether `descriptor`'s next cron occurrence (offset by its
    /// stable per-descriptor jitter) has arrived since it last fired.
    fn is_due(&self, descriptor: &MirrorDescriptor, now: DateTime<Utc>) -> bool {
        let schedule = match cron::Schedule::from_str(&descriptor.cron) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let last_millis = self
            .last_fired_millis
            .get(&descriptor.id)
            .map(|v| *v)
            .unwrap_or(0);
        let last = Utc
            .timestamp_millis_opt(last_millis)
            .single()
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap());
        let jitter = chrono::Duration::seconds(descriptor.jitter_seconds() as i64);
        match schedule.after(&last).next() {
            Some(next) if next + jitter <= now => {
                self.last_fired_millis
                    .insert(descriptor.id.clone(), now.timestamp_millis());
                true
            }
            _ => false,
        }
    }
}

enum ZoneDecision {
    Ours,
    NotOurZone,
    Invalid(String),
}
