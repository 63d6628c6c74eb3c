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

//! The Watch Engine (SPEC_FULL.md §4.C): long-poll subscriptions that wake
//! on a matching commit or expire with jittered timeouts. Decoupled from
//! the Storage Backend and Command Executor via the commit-event mediator
//! channel (SPEC_FULL.md §9) — this engine never holds a strong reference
//! back into the executor, only a `broadcast::Receiver` it was handed.

use crate::error::WatchError;
use crate::jitter::apply_jitter;
use dogma_core::{Entry, PathPattern, Revision};
use dogma_executor::CommitEvent;
use dogma_storage::{CommitLog, StorageError};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Gauges and counters mirroring SPEC_FULL.md §4.C step 1/5 ("increment
/// `watches.active` gauge" / "increment the matching counter").
#[derive(Debug, Default)]
pub struct WatchMetrics {
    pub active: AtomicI64,
    pub wakeups: AtomicU64,
    pub timeouts: AtomicU64,
    pub failures: AtomicU64,
}

/// The long-poll engine. One instance is shared process-wide; each watch
/// call is handed the `CommitLog` and commit-event receiver for the
/// repository it targets by the caller (`dogma-server`), which does hold
/// the executor.
pub struct WatchEngine {
    policy_max_ms: u64,
    metrics: WatchMetrics,
}

impl WatchEngine {
    pub fn new(policy_max_ms: u64) -> Self {
        Self {
            policy_max_ms,
            metrics: WatchMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &WatchMetrics {
        &self.metrics
    }

    /// SPEC_FULL.md §4.C `watchRepository`: resolves once a commit touching
    /// `pattern` lands at a revision strictly after `last_known_rev`, or
    /// `Cancelled` at the (jittered) timeout. `timeout_ms = None` waits
    /// indefinitely.
    pub async fn watch_repository(
        &self,
        log: &CommitLog,
        commits: &mut broadcast::Receiver<CommitEvent>,
        project: &str,
        repo: &str,
        last_known_rev: Revision,
        pattern: &str,
        timeout_ms: Option<u64>,
    ) -> Result<Revision, WatchError> {
        // Step 2: ask the storage backend whether a qualifying change has
        // already occurred before parking anything.
        if let Some(rev) = log.find_latest_revision(last_known_rev, pattern)? {
            self.metrics.wakeups.fetch_add(1, Ordering::Relaxed);
            return Ok(rev);
        }

        let matcher = PathPattern::parse(pattern)
            .map_err(StorageError::Core)
            .map_err(WatchError::from)?;

        // Step 1: register in the pending set (here, just the gauge; the
        // "set" itself is the caller's map of in-flight long-poll futures).
        self.metrics.active.fetch_add(1, Ordering::Relaxed);
        let result = self
            .wait_for_match(commits, project, repo, &matcher, timeout_ms)
            .await;
        self.metrics.active.fetch_sub(1, Ordering::Relaxed);

        match &result {
            Ok(_) => {
                self.metrics.wakeups.fetch_add(1, Ordering::Relaxed);
            }
            Err(WatchError::Cancelled) => {
                self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    async fn wait_for_match(
        &self,
        commits: &mut broadcast::Receiver<CommitEvent>,
        project: &str,
        repo: &str,
        pattern: &PathPattern,
        timeout_ms: Option<u64>,
    ) -> Result<Revision, WatchError> {
        let deadline = timeout_ms.map(|ms| apply_jitter(ms, self.policy_max_ms));
        loop {
            let recv = commits.recv();
            let outcome = match deadline {
                Some(d) => tokio::time::timeout(d, recv).await.map_err(|_elapsed| None),
                None => Ok(recv.await),
            };
            let event = match outcome {
                Err(None) => return Err(WatchError::Cancelled), // timer fired
                Ok(Ok(event)) => event,
                // A slow consumer missed some broadcast messages; the next
                // `recv` still returns fresh events, so retry rather than
                // treating this as a failure.
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    // The executor shut down while this watch was parked.
                    return Err(WatchError::Cancelled);
                }
                Err(Some(_)) => unreachable!(),
            };
            if event.project == project
                && event.repo == repo
                && event.paths_changed.iter().any(|p| pattern.matches(p))
            {
                return Ok(event.revision);
            }
        }
    }

    /// SPEC_FULL.md §4.C `watchFile`: like `watch_repository`, but resolves
    /// with the new `Entry` at `path` rather than the bare revision.
    pub async fn watch_file(
        &self,
        log: &CommitLog,
        commits: &mut broadcast::Receiver<CommitEvent>,
        project: &str,
        repo: &str,
        last_known_rev: Revision,
        path: &str,
        timeout_ms: Option<u64>,
    ) -> Result<Entry, WatchError> {
        let rev = self
            .watch_repository(log, commits, project, repo, last_known_rev, path, timeout_ms)
            .await?;
        Ok(log.get(rev, path)?)
    }

    /// SPEC_FULL.md §4.C "File watch with derived variables": watches both
    /// `data_pattern` and, if present, `variables_pattern` — either
    /// triggers re-evaluation via `evaluate` — but only resolves once the
    /// transformed value actually differs from `previous`. Loops
    /// internally on no-op re-evaluations rather than waking the caller
    /// for a change that didn't affect the derived value.
    pub async fn watch_query<T, F>(
        &self,
        log: &CommitLog,
        commits: &mut broadcast::Receiver<CommitEvent>,
        project: &str,
        repo: &str,
        mut last_known_rev: Revision,
        data_pattern: &str,
        variables_pattern: Option<&str>,
        timeout_ms: Option<u64>,
        mut evaluate: F,
        previous: &T,
    ) -> Result<(Revision, T), WatchError>
    where
        F: FnMut(&CommitLog, Revision) -> Result<T, WatchError>,
        T: PartialEq,
    {
        let combined_pattern = match variables_pattern {
            Some(variables) => format!("{data_pattern},{variables}"),
            None => data_pattern.to_string(),
        };
        loop {
            let rev = self
                .watch_repository(
                    log,
                    commits,
                    project,
                    repo,
                    last_known_rev,
                    &combined_pattern,
                    timeout_ms,
                )
                .await?;
            let value = evaluate(log, rev)?;
            if &value != previous {
                return Ok((rev, value));
            }
            last_known_rev = rev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogma_core::{Author, Change, CommitMessage, EntryContent};

    fn event(project: &str, repo: &str, rev: i32, paths: &[&str]) -> CommitEvent {
        CommitEvent {
            project: project.to_string(),
            repo: repo.to_string(),
            revision: Revision::new(rev),
            paths_changed: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn resolves_immediately_if_already_qualifying() {
        let log = CommitLog::new();
        log.commit(
            Revision::new(0),
            Author::new("alice"),
            CommitMessage::summary_only("init"),
            vec![Change::upsert("/other.json", EntryContent::Json(serde_json::json!(0)))],
            true,
        )
        .unwrap();
        // A commit touching the watched path lands before the watcher ever
        // calls in (e.g. it raced the request that fetched `head`); the
        // history scan in step 2 should find it without ever parking.
        log.commit(
            Revision::new(1),
            Author::new("alice"),
            CommitMessage::summary_only("second"),
            vec![Change::upsert("/a.json", EntryContent::Json(serde_json::json!(1)))],
            true,
        )
        .unwrap();
        let (_tx, mut rx) = broadcast::channel(16);
        let engine = WatchEngine::new(60_000);
        let rev = engine
            .watch_repository(&log, &mut rx, "proj", "repo", Revision::new(1), "/a.json", None)
            .await
            .unwrap();
        assert_eq!(rev, Revision::new(2));
        assert_eq!(engine.metrics().wakeups.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn wakes_on_matching_commit_event() {
        let log = CommitLog::new();
        let (tx, mut rx) = broadcast::channel(16);
        let engine = WatchEngine::new(60_000);

        let sender = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let _ = sender.send(event("proj", "repo", 1, &["/a.json"]));
        });

        let rev = engine
            .watch_repository(&log, &mut rx, "proj", "repo", Revision::new(0), "/a.json", Some(5_000))
            .await
            .unwrap();
        assert_eq!(rev, Revision::new(1));
    }

    #[tokio::test]
    async fn ignores_events_for_other_repositories() {
        let log = CommitLog::new();
        let (tx, mut rx) = broadcast::channel(16);
        let engine = WatchEngine::new(60_000);

        tx.send(event("other", "repo", 1, &["/a.json"])).unwrap();
        tokio::spawn({
            let tx = tx.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                let _ = tx.send(event("proj", "repo", 2, &["/a.json"]));
            }
        });

        let rev = engine
            .watch_repository(&log, &mut rx, "proj", "repo", Revision::new(0), "/a.json", Some(5_000))
            .await
            .unwrap();
        assert_eq!(rev, Revision::new(2));
    }

    #[tokio::test]
    async fn times_out_on_idle_repository() {
        let log = CommitLog::new();
        let (_tx, mut rx) = broadcast::channel(16);
        let engine = WatchEngine::new(60_000);

        let start = std::time::Instant::now();
        let result = engine
            .watch_repository(&log, &mut rx, "proj", "repo", Revision::new(0), "/none.json", Some(200))
            .await;
        let elapsed = start.elapsed();
        assert!(matches!(result, Err(WatchError::Cancelled)));
        assert!(elapsed.as_millis() >= 150, "elapsed {elapsed:?} looked too short");
        assert_eq!(engine.metrics().timeouts.load(Ordering::Relaxed), 1);
    }
}
