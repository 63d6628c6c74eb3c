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

//! `ReplicationLog`: the abstracted consensus layer a real deployment would
//! back with Raft or similar (SPEC_FULL.md §4.B.1). This crate ships only
//! `LocalReplicationLog`, a single-node stand-in that behaves as an
//! already-converged one-member cluster: it assigns sequence numbers from
//! an atomic counter and broadcasts immediately, satisfying every ordering
//! guarantee the executor depends on without simulating network behavior.

use crate::command::Command;
use crate::error::ExecutorError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Global sequence number assigned to a proposed [`Command`].
pub type SequenceNo = u64;

/// The replication abstraction the executor proposes every command
/// through. A real multi-node backend only changes how long `propose`
/// suspends before acking; the ordering contract stays the same.
#[async_trait]
pub trait ReplicationLog: Send + Sync {
    async fn propose(&self, command: Command) -> Result<SequenceNo, ExecutorError>;

    /// Subscribes to the stream of committed `(sequence, command)` pairs,
    /// in assignment order. Every replica — including the proposer, for
    /// commands originating elsewhere — applies commands it reads here.
    fn subscribe(&self) -> broadcast::Receiver<(SequenceNo, Command)>;
}

/// Single-node [`ReplicationLog`]. Appropriate for one-process deployments
/// and tests.
pub struct LocalReplicationLog {
    next_seq: AtomicU64,
    sender: broadcast::Sender<(SequenceNo, Command)>,
}

impl LocalReplicationLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            next_seq: AtomicU64::new(1),
            sender,
        }
    }
}

impl Default for LocalReplicationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicationLog for LocalReplicationLog {
    async fn propose(&self, command: Command) -> Result<SequenceNo, ExecutorError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        // A closed channel (no subscribers at all, e.g. in a unit test that
        // only proposes) is not an error: there is simply nothing to
        // notify yet.
        let _ = self.sender.send((seq, command));
        Ok(seq)
    }

    fn subscribe(&self) -> broadcast::Receiver<(SequenceNo, Command)> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandPayload, CommandTarget};
    use dogma_core::Author;

    #[tokio::test]
    async fn sequence_numbers_are_monotonic() {
        let log = LocalReplicationLog::new();
        let mut rx = log.subscribe();
        let cmd = |n: &str| {
            Command::new(
                Author::new("alice"),
                CommandTarget::project(n),
                CommandPayload::CreateProject,
            )
        };
        let s1 = log.propose(cmd("a")).await.unwrap();
        let s2 = log.propose(cmd("b")).await.unwrap();
        assert!(s2 > s1);
        let (seq, _) = rx.recv().await.unwrap();
        assert_eq!(seq, s1);
    }
}
