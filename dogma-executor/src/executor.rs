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

//! The Command Executor (SPEC_FULL.md §4.B): the single entry point every
//! mutation funnels through, whether it originates on this node or arrives
//! already-ordered from the replication log.

use crate::command::{Command, CommandOutcome, CommandPayload, CommandTarget, StatusScope};
use crate::error::ExecutorError;
use crate::replication::{ReplicationLog, SequenceNo};
use dashmap::DashMap;
use dogma_core::{
    Author, Project, Revision, RepositoryMeta, RepositoryStatus, META_REPOSITORY_NAME,
};
use dogma_crypto::{generate_wdek, KekProvider, Wdek};
use dogma_storage::CommitLog;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{error, info, warn};

/// A repository that have not yet been purged that belong to this process
/// own a commit log and their own encryption state; the WDEK is kept here
/// rather than in `dogma_core::RepositoryMeta` so the core crate stays free
/// of a dependency on the crypto crate (SPEC_FULL.md §9 "composition of
/// small traits").
struct RepoEntry {
    meta: parking_lot::RwLock<RepositoryMeta>,
    log: Arc<CommitLog>,
    wdek: parking_lot::RwLock<Option<Wdek>>,
    /// Serializes command application for this one repository
    /// (SPEC_FULL.md §5 "a per-repository lock held only during apply").
    apply_lock: Mutex<()>,
}

struct ProjectEntry {
    meta: parking_lot::RwLock<Project>,
    repos: DashMap<String, Arc<RepoEntry>>,
}

/// A commit notification, emitted on every successful `Push` so the Watch
/// Engine can wake parked watchers without holding a reference back into
/// the executor (SPEC_FULL.md §9 "mediator" design note).
#[derive(Debug, Clone)]
pub struct CommitEvent {
    pub project: String,
    pub repo: String,
    pub revision: Revision,
    pub paths_changed: Vec<String>,
}

/// The maximum revision count a repository may have when migrating to
/// encrypted (SPEC_FULL.md §4.E "Migration to encrypted").
const MAX_REVISIONS_FOR_MIGRATION: i32 = 1000;

/// The Command Executor: owns the project/repository registry, the
/// writable/replicating/started state, and the mediator broadcast channel
/// the Watch Engine subscribes to. Every mutating operation is expressed as
/// a [`Command`], proposed through a [`ReplicationLog`], and applied by a
/// single background task in log order (SPEC_FULL.md §4.B).
pub struct CommandExecutor {
    projects: DashMap<String, Arc<ProjectEntry>>,
    replication: Arc<dyn ReplicationLog>,
    kek_provider: Arc<dyn KekProvider>,
    writable: AtomicBool,
    replicating: AtomicBool,
    started: AtomicBool,
    commit_events: broadcast::Sender<CommitEvent>,
    pending: DashMap<u64, oneshot::Sender<Result<CommandOutcome, ExecutorError>>>,
    next_correlation: AtomicU64,
}

impl CommandExecutor {
    pub fn new(replication: Arc<dyn ReplicationLog>, kek_provider: Arc<dyn KekProvider>) -> Arc<Self> {
        let (commit_events, _) = broadcast::channel(1024);
        Arc::new(Self {
            projects: DashMap::new(),
            replication,
            kek_provider,
            writable: AtomicBool::new(false),
            replicating: AtomicBool::new(false),
            started: AtomicBool::new(false),
            commit_events,
            pending: DashMap::new(),
            next_correlation: AtomicU64::new(1),
        })
    }

    /// Subscribes to the commit-event mediator channel (consumed by
    /// `dogma-watch`; see SPEC_FULL.md §9).
    pub fn subscribe_commits(&self) -> broadcast::Receiver<CommitEvent> {
        self.commit_events.subscribe()
    }

    pub fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_replicating(&self) -> bool {
        self.replicating.load(Ordering::SeqCst)
    }

    /// Starts the executor: marks it replicating and writable, and spawns
    /// the single background applier task that drains the replication log
    /// in order. Returns the `JoinHandle` so callers can await a clean
    /// shutdown after `stop()`.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.started.store(true, Ordering::SeqCst);
        self.replicating.store(true, Ordering::SeqCst);
        self.writable.store(true, Ordering::SeqCst);
        let this = Arc::clone(self);
        let mut rx = self.replication.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok((seq, command)) => this.on_committed(seq, command).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "executor applier lagged behind replication log");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Quiesces the executor: no further commands are accepted locally.
    /// In-flight commands already proposed are still applied when they
    /// arrive through the replication log.
    pub fn stop(&self) {
        self.writable.store(false, Ordering::SeqCst);
        self.started.store(false, Ordering::SeqCst);
    }

    async fn on_committed(self: &Arc<Self>, seq: SequenceNo, command: Command) {
        let correlation = command.correlation;
        let result = self.apply(command).await;
        if let Some(id) = correlation {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(result);
                return;
            }
        }
        if let Err(e) = &result {
            error!(seq, error = %e, "unobserved command application failure");
        }
    }

    /// Proposes `command` (tagging it with a fresh correlation id so the
    /// applier task can route the outcome back here) and waits for it to be
    /// applied. The registration happens strictly before `propose`, so
    /// there is no race between the applier picking up the broadcast and
    /// this method listening for the result.
    async fn propose_and_await(&self, mut command: Command) -> Result<CommandOutcome, ExecutorError> {
        let id = self.next_correlation.fetch_add(1, Ordering::SeqCst);
        command.correlation = Some(id);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if let Err(e) = self.replication.propose(command).await {
            self.pending.remove(&id);
            return Err(e);
        }
        rx.await
            .map_err(|_| ExecutorError::Replication("applier dropped the result channel".into()))?
    }

    fn require_writable(&self) -> Result<(), ExecutorError> {
        if !self.is_started() {
            return Err(ExecutorError::ServerStopping);
        }
        if !self.is_writable() {
            return Err(ExecutorError::ServerNotWritable);
        }
        Ok(())
    }

    fn project(&self, name: &str) -> Result<Arc<ProjectEntry>, ExecutorError> {
        self.projects
            .get(name)
            .map(|e| Arc::clone(&e))
            .ok_or_else(|| ExecutorError::ProjectNotFound(name.to_string()))
    }

    fn repo(&self, project: &str, repo: &str) -> Result<Arc<RepoEntry>, ExecutorError> {
        let p = self.project(project)?;
        p.repos
            .get(repo)
            .map(|e| Arc::clone(&e))
            .ok_or_else(|| ExecutorError::RepositoryNotFound(project.to_string(), repo.to_string()))
    }

    /// Read-path access to a repository's commit log (SPEC_FULL.md §2
    /// "clients issue read queries that go straight to [the Storage
    /// Backend]"): reads bypass the command pipeline entirely, since they
    /// need no ordering against other reads, only against the single
    /// per-repository apply lock that every write already takes.
    pub fn commit_log(&self, project: &str, repo: &str) -> Result<Arc<CommitLog>, ExecutorError> {
        Ok(Arc::clone(&self.repo(project, repo)?.log))
    }

    /// Read-path access to a repository's metadata snapshot.
    pub fn repository_meta(&self, project: &str, repo: &str) -> Result<RepositoryMeta, ExecutorError> {
        Ok(self.repo(project, repo)?.meta.read().clone())
    }

    /// Read-path access to a project's metadata snapshot.
    pub fn project_meta(&self, project: &str) -> Result<Project, ExecutorError> {
        Ok(self.project(project)?.meta.read().clone())
    }

    /// Lists the (non-purged) repository names under a project, including
    /// the reserved meta repository.
    pub fn repository_names(&self, project: &str) -> Result<Vec<String>, ExecutorError> {
        let p = self.project(project)?;
        Ok(p.repos.iter().map(|e| e.key().clone()).collect())
    }

    /// Lists all known project names.
    pub fn project_names(&self) -> Vec<String> {
        self.projects.iter().map(|e| e.key().clone()).collect()
    }

    // ---- Public mutating API: builds a Command, proposes it, awaits the
    // applied outcome. ----

    pub async fn create_project(&self, author: Author, name: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(author, CommandTarget::project(name), CommandPayload::CreateProject);
        match self.propose_and_await(command).await? {
            CommandOutcome::ProjectCreated => Ok(()),
            other => unreachable!("CreateProject applied to unexpected outcome: {other:?}"),
        }
    }

    pub async fn remove_project(&self, author: Author, name: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(author, CommandTarget::project(name), CommandPayload::RemoveProject);
        self.propose_and_await(command).await.map(|_| ())
    }

    pub async fn unremove_project(&self, author: Author, name: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(author, CommandTarget::project(name), CommandPayload::UnremoveProject);
        self.propose_and_await(command).await.map(|_| ())
    }

    pub async fn create_repository(
        &self,
        author: Author,
        project: &str,
        repo: &str,
        encrypt: bool,
    ) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(
            author,
            CommandTarget::repository(project, repo),
            CommandPayload::CreateRepository { encrypt },
        );
        self.propose_and_await(command).await.map(|_| ())
    }

    pub async fn remove_repository(&self, author: Author, project: &str, repo: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(
            author,
            CommandTarget::repository(project, repo),
            CommandPayload::RemoveRepository,
        );
        self.propose_and_await(command).await.map(|_| ())
    }

    pub async fn unremove_repository(&self, author: Author, project: &str, repo: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(
            author,
            CommandTarget::repository(project, repo),
            CommandPayload::UnremoveRepository,
        );
        self.propose_and_await(command).await.map(|_| ())
    }

    pub async fn purge_repository(&self, author: Author, project: &str, repo: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        let command = Command::new(
            author,
            CommandTarget::repository(project, repo),
            CommandPayload::PurgeRepository,
        );
        self.propose_and_await(command).await.map(|_| ())
    }

    /// Proposes a push and returns the assigned revision.
    pub async fn push(
        &self,
        author: Author,
        project: &str,
        repo: &str,
        base_revision: Revision,
        message: dogma_core::CommitMessage,
        changes: Vec<dogma_core::Change>,
    ) -> Result<Revision, ExecutorError> {
        self.require_writable()?;
        let command = Command::new(
            author,
            CommandTarget::repository(project, repo),
            CommandPayload::Push {
                base_revision,
                message,
                changes,
            },
        );
        match self.propose_and_await(command).await? {
            CommandOutcome::Pushed(rev) => Ok(rev),
            other => unreachable!("Push applied to unexpected outcome: {other:?}"),
        }
    }

    /// SPEC_FULL.md §4.B "Scope of status updates": `Local` mutates this
    /// node's atomics directly without going through replication at all,
    /// returning `NotModified` if nothing changed; `All` always replicates.
    pub async fn set_server_status(
        &self,
        author: Author,
        scope: StatusScope,
        writable: bool,
        replicating: bool,
    ) -> Result<(), ExecutorError> {
        if writable && !replicating {
            return Err(ExecutorError::BadRequest(
                "writable=true requires replicating=true".to_string(),
            ));
        }
        match scope {
            StatusScope::Local => {
                let changed = self.writable.swap(writable, Ordering::SeqCst) != writable
                    || self.replicating.swap(replicating, Ordering::SeqCst) != replicating;
                if !changed {
                    return Err(ExecutorError::NotModified);
                }
                Ok(())
            }
            StatusScope::All => {
                let command = Command::new(
                    author,
                    CommandTarget::project(META_REPOSITORY_NAME),
                    CommandPayload::UpdateServerStatus { writable, replicating },
                );
                self.propose_and_await(command).await.map(|_| ())
            }
        }
    }

    /// Guarded migration to an encrypted repository (SPEC_FULL.md §4.E):
    /// only non-meta repositories under 1000 revisions, not already
    /// encrypted, not read-only. Marks the repository `READ_ONLY` for the
    /// duration of the rewrite and restores `ACTIVE` whether it succeeds or
    /// fails.
    pub async fn migrate_encrypted(&self, author: Author, project: &str, repo: &str) -> Result<(), ExecutorError> {
        self.require_writable()?;
        if repo == META_REPOSITORY_NAME {
            return Err(ExecutorError::BadRequest(
                "the meta repository cannot be encrypted".to_string(),
            ));
        }
        let command = Command::new(
            author,
            CommandTarget::repository(project, repo),
            CommandPayload::MigrateEncrypted,
        );
        self.propose_and_await(command).await.map(|_| ())
    }

    // ---- Application: runs once per command, strictly in log order,
    // inside the single applier task spawned by `start()`. ----

    async fn apply(&self, command: Command) -> Result<CommandOutcome, ExecutorError> {
        let project_name = command.target.project.clone();
        match &command.payload {
            CommandPayload::CreateProject => self.apply_create_project(&command),
            CommandPayload::RemoveProject => self.apply_set_project_status(&project_name, RepositoryStatus::Removed),
            CommandPayload::UnremoveProject => {
                self.apply_set_project_status(&project_name, RepositoryStatus::Active)
            }
            CommandPayload::CreateRepository { encrypt } => {
                self.apply_create_repository(&command, *encrypt)
            }
            CommandPayload::RemoveRepository => {
                self.apply_set_repo_status(&command, RepositoryStatus::Removed)
            }
            CommandPayload::UnremoveRepository => {
                self.apply_set_repo_status(&command, RepositoryStatus::Active)
            }
            CommandPayload::PurgeRepository => self.apply_purge_repository(&command),
            CommandPayload::Push {
                base_revision,
                message,
                changes,
            } => {
                self.apply_push(&command, *base_revision, message.clone(), changes.clone())
                    .await
            }
            CommandPayload::UpdateServerStatus { writable, replicating } => {
                self.apply_update_server_status(*writable, *replicating)
            }
            CommandPayload::MigrateEncrypted => self.apply_migrate_encrypted(&command).await,
        }
    }

    fn apply_create_project(&self, command: &Command) -> Result<CommandOutcome, ExecutorError> {
        let name = &command.target.project;
        if self.projects.contains_key(name) {
            return Err(ExecutorError::ProjectAlreadyExists(name.clone()));
        }
        let project = Project::new(name.clone(), command.author.clone(), command.timestamp_millis);
        let entry = Arc::new(ProjectEntry {
            meta: parking_lot::RwLock::new(project),
            repos: DashMap::new(),
        });
        // Every project gets its reserved `dogma` meta repository alongside
        // it (SPEC_FULL.md §6 "Meta repository").
        entry.repos.insert(
            META_REPOSITORY_NAME.to_string(),
            Arc::new(RepoEntry {
                meta: parking_lot::RwLock::new(RepositoryMeta::new(
                    META_REPOSITORY_NAME,
                    command.author.clone(),
                    command.timestamp_millis,
                )),
                log: Arc::new(CommitLog::new()),
                wdek: parking_lot::RwLock::new(None),
                apply_lock: Mutex::new(()),
            }),
        );
        self.projects.insert(name.clone(), entry);
        info!(project = %name, "project created");
        Ok(CommandOutcome::ProjectCreated)
    }

    fn apply_set_project_status(
        &self,
        name: &str,
        status: RepositoryStatus,
    ) -> Result<CommandOutcome, ExecutorError> {
        let entry = self.project(name)?;
        entry.meta.write().status = status;
        Ok(if status == RepositoryStatus::Removed {
            CommandOutcome::ProjectRemoved
        } else {
            CommandOutcome::ProjectUnremoved
        })
    }

    fn apply_create_repository(
        &self,
        command: &Command,
        encrypt: bool,
    ) -> Result<CommandOutcome, ExecutorError> {
        let project = self.project(&command.target.project)?;
        let repo_name = command
            .target
            .repo_name()
            .ok_or_else(|| ExecutorError::BadRequest("repository name is required".to_string()))?;
        if project.repos.contains_key(repo_name) {
            return Err(ExecutorError::RepositoryAlreadyExists(
                command.target.project.clone(),
                repo_name.to_string(),
            ));
        }
        let log = Arc::new(CommitLog::new());
        let mut meta = RepositoryMeta::new(repo_name, command.author.clone(), command.timestamp_millis);
        let wdek = if encrypt {
            let (cipher, wdek) = generate_wdek(self.kek_provider.as_ref())
                .map_err(|e| ExecutorError::BadRequest(format!("failed to provision encryption: {e}")))?;
            log.migrate_to_encrypted(Arc::new(cipher))
                .map_err(ExecutorError::from)?;
            meta.encrypted = true;
            Some(wdek)
        } else {
            None
        };
        project.repos.insert(
            repo_name.to_string(),
            Arc::new(RepoEntry {
                meta: parking_lot::RwLock::new(meta),
                log,
                wdek: parking_lot::RwLock::new(wdek),
                apply_lock: Mutex::new(()),
            }),
        );
        info!(project = %command.target.project, repo = %repo_name, encrypt, "repository created");
        Ok(CommandOutcome::RepositoryCreated)
    }

    fn apply_set_repo_status(
        &self,
        command: &Command,
        status: RepositoryStatus,
    ) -> Result<CommandOutcome, ExecutorError> {
        let repo_name = command
            .target
            .repo_name()
            .ok_or_else(|| ExecutorError::BadRequest("repository name is required".to_string()))?;
        let entry = self.repo(&command.target.project, repo_name)?;
        entry.meta.write().status = status;
        Ok(if status == RepositoryStatus::Removed {
            CommandOutcome::RepositoryRemoved
        } else {
            CommandOutcome::RepositoryUnremoved
        })
    }

    fn apply_purge_repository(&self, command: &Command) -> Result<CommandOutcome, ExecutorError> {
        let repo_name = command
            .target
            .repo_name()
            .ok_or_else(|| ExecutorError::BadRequest("repository name is required".to_string()))?;
        let project = self.project(&command.target.project)?;
        let (_, entry) = project
            .repos
            .remove(repo_name)
            .ok_or_else(|| ExecutorError::RepositoryNotFound(command.target.project.clone(), repo_name.to_string()))?;
        if entry.meta.read().status != RepositoryStatus::Removed {
            // Put it back; purge only applies to already-tombstoned repos.
            project.repos.insert(repo_name.to_string(), entry);
            return Err(ExecutorError::BadRequest(
                "repository must be removed before it can be purged".to_string(),
            ));
        }
        Ok(CommandOutcome::RepositoryPurged)
    }

    async fn apply_push(
        &self,
        command: &Command,
        base_revision: Revision,
        message: dogma_core::CommitMessage,
        changes: Vec<dogma_core::Change>,
    ) -> Result<CommandOutcome, ExecutorError> {
        let repo_name = command
            .target
            .repo_name()
            .ok_or_else(|| ExecutorError::BadRequest("repository name is required".to_string()))?;
        let entry = self.repo(&command.target.project, repo_name)?;
        if !entry.meta.read().is_writable() {
            return Err(ExecutorError::ReadOnly(command.target.project.clone(), repo_name.to_string()));
        }
        // Every commit against this one repository is strictly serialized
        // here; this is the "per-repository lock held only during apply"
        // of SPEC_FULL.md §5.
        let _guard = entry.apply_lock.lock().await;
        let revision = entry
            .log
            .commit(base_revision, command.author.clone(), message, changes.clone(), true)?;
        let paths_changed: Vec<String> = changes.iter().map(|c| c.path.clone()).collect();
        // Step 5 of the commit algorithm: notify the Watch Engine mediator.
        // A send with no subscribers is not an error — there may be no
        // watcher registered yet.
        let _ = self.commit_events.send(CommitEvent {
            project: command.target.project.clone(),
            repo: repo_name.to_string(),
            revision,
            paths_changed,
        });
        Ok(CommandOutcome::Pushed(revision))
    }

    fn apply_update_server_status(
        &self,
        writable: bool,
        replicating: bool,
    ) -> Result<CommandOutcome, ExecutorError> {
        if writable && !replicating {
            return Err(ExecutorError::BadRequest(
                "writable=true requires replicating=true".to_string(),
            ));
        }
        let changed = self.writable.swap(writable, Ordering::SeqCst) != writable
            || self.replicating.swap(replicating, Ordering::SeqCst) != replicating;
        if !changed {
            return Err(ExecutorError::NotModified);
        }
        Ok(CommandOutcome::ServerStatusUpdated)
    }

    async fn apply_migrate_encrypted(&self, command: &Command) -> Result<CommandOutcome, ExecutorError> {
        let repo_name = command
            .target
            .repo_name()
            .ok_or_else(|| ExecutorError::BadRequest("repository name is required".to_string()))?;
        let entry = self.repo(&command.target.project, repo_name)?;

        {
            let meta = entry.meta.read();
            if meta.encrypted {
                return Err(ExecutorError::BadRequest("repository is already encrypted".to_string()));
            }
            if meta.status != RepositoryStatus::Active {
                return Err(ExecutorError::ReadOnly(command.target.project.clone(), repo_name.to_string()));
            }
        }
        if entry.log.head() >= MAX_REVISIONS_FOR_MIGRATION {
            return Err(ExecutorError::BadRequest(format!(
                "repository has {} revisions, over the {MAX_REVISIONS_FOR_MIGRATION}-revision migration limit",
                entry.log.head()
            )));
        }

        let _guard = entry.apply_lock.lock().await;
        entry.meta.write().status = RepositoryStatus::ReadOnly;

        let outcome = generate_wdek(self.kek_provider.as_ref())
            .map_err(|e| ExecutorError::BadRequest(format!("failed to provision encryption: {e}")))
            .and_then(|(cipher, wdek)| {
                entry
                    .log
                    .migrate_to_encrypted(Arc::new(cipher))
                    .map_err(ExecutorError::from)
                    .map(|()| wdek)
            });

        match outcome {
            Ok(wdek) => {
                *entry.wdek.write() = Some(wdek);
                entry.meta.write().encrypted = true;
                entry.meta.write().status = RepositoryStatus::Active;
                info!(project = %command.target.project, repo = %repo_name, "repository migrated to encrypted");
                Ok(CommandOutcome::MigratedEncrypted)
            }
            Err(e) => {
                entry.meta.write().status = RepositoryStatus::Active;
                error!(project = %command.target.project, repo = %repo_name, error = %e, "encryption migration failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::LocalReplicationLog;
    use dogma_core::{Change, CommitMessage, EntryContent};
    use dogma_crypto::InMemoryKekProvider;

    fn executor() -> Arc<CommandExecutor> {
        let replication = Arc::new(LocalReplicationLog::new());
        let kek = Arc::new(InMemoryKekProvider::new());
        let exec = CommandExecutor::new(replication, kek);
        exec.start();
        exec
    }

    #[tokio::test]
    async fn create_project_creates_meta_repository() {
        let exec = executor();
        exec.create_project(Author::new("alice"), "proj").await.unwrap();
        let err = exec
            .create_project(Author::new("alice"), "proj")
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::ProjectAlreadyExists(_)));
    }

    #[tokio::test]
    async fn push_requires_existing_repository() {
        let exec = executor();
        exec.create_project(Author::new("alice"), "proj").await.unwrap();
        let err = exec
            .push(
                Author::new("alice"),
                "proj",
                "missing",
                Revision::HEAD,
                CommitMessage::summary_only("x"),
                vec![Change::upsert("/a.json", EntryContent::Json(serde_json::json!(1)))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::RepositoryNotFound(_, _)));
    }

    #[tokio::test]
    async fn push_assigns_sequential_revisions_and_emits_commit_events() {
        let exec = executor();
        exec.create_project(Author::new("alice"), "proj").await.unwrap();
        exec.create_repository(Author::new("alice"), "proj", "repo", false)
            .await
            .unwrap();
        let mut rx = exec.subscribe_commits();

        let rev1 = exec
            .push(
                Author::new("alice"),
                "proj",
                "repo",
                Revision::HEAD,
                CommitMessage::summary_only("first"),
                vec![Change::upsert("/a.json", EntryContent::Json(serde_json::json!(1)))],
            )
            .await
            .unwrap();
        assert_eq!(rev1, Revision::new(1));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.revision, Revision::new(1));
        assert_eq!(event.paths_changed, vec!["/a.json".to_string()]);
    }

    #[tokio::test]
    async fn server_status_requires_replicating_to_go_writable() {
        let exec = executor();
        let err = exec
            .set_server_status(Author::system("admin"), StatusScope::Local, true, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::BadRequest(_)));
    }

    #[tokio::test]
    async fn local_status_update_is_not_modified_when_unchanged() {
        let exec = executor();
        // start() already set writable=true, replicating=true.
        let err = exec
            .set_server_status(Author::system("admin"), StatusScope::Local, true, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::NotModified));
    }

    #[tokio::test]
    async fn migrate_encrypted_round_trips_content() {
        let exec = executor();
        exec.create_project(Author::new("alice"), "proj").await.unwrap();
        exec.create_repository(Author::new("alice"), "proj", "repo", false)
            .await
            .unwrap();
        exec.push(
            Author::new("alice"),
            "proj",
            "repo",
            Revision::HEAD,
            CommitMessage::summary_only("first"),
            vec![Change::upsert("/a.json", EntryContent::Json(serde_json::json!({"x": 1})))],
        )
        .await
        .unwrap();

        exec.migrate_encrypted(Author::system("admin"), "proj", "repo")
            .await
            .unwrap();

        let entry = exec.repo("proj", "repo").unwrap();
        assert!(entry.log.is_encrypted());
        assert_eq!(entry.meta.read().status, RepositoryStatus::Active);
        assert!(entry.wdek.read().is_some());
        let got = entry.log.get(Revision::HEAD, "/a.json").unwrap();
        assert_eq!(got.content, EntryContent::Json(serde_json::json!({"x": 1})));
    }
}
