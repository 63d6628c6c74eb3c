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

//! `MirrorDescriptor` (SPEC_FULL.md §4.D): itself a versioned entry in a
//! project's meta-repository, not a separate store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    LocalToRemote,
    RemoteToLocal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorDescriptor {
    pub id: String,
    pub enabled: bool,
    pub direction: Direction,
    /// Standard 6-field cron (seconds first), matched by the `cron` crate.
    pub cron: String,
    pub local_repo: String,
    pub local_path: String,
    pub remote_uri: String,
    pub remote_path: String,
    pub remote_branch: String,
    pub gitignore: Option<String>,
    pub credential_id: Option<String>,
    pub zone_hint: Option<String>,
}

impl MirrorDescriptor {
    /// A stable, per-descriptor jitter in `[0, 60)` seconds, derived by
    /// hashing the descriptor's identity rather than sampled randomly, so
    /// the same mirror always ticks at the same offset from its cron time
    /// across scheduler restarts (SPEC_FULL.md §4.D "Scheduler loop").
    pub fn jitter_seconds(&self) -> u64 {
        let hash = blake3::hash(self.id.as_bytes());
        let bytes = hash.as_bytes();
        let n = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        n % 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> MirrorDescriptor {
        MirrorDescriptor {
            id: id.to_string(),
            enabled: true,
            direction: Direction::RemoteToLocal,
            cron: "0 * * * * *".to_string(),
            local_repo: "repo".to_string(),
            local_path: "/".to_string(),
            remote_uri: "https://example.test/repo.git".to_string(),
            remote_path: "/".to_string(),
            remote_branch: "main".to_string(),
            gitignore: None,
            credential_id: None,
            zone_hint: None,
        }
    }

    #[test]
    fn jitter_is_stable_across_calls() {
        let d = descriptor("m1");
        assert_eq!(d.jitter_seconds(), d.jitter_seconds());
        assert!(d.jitter_seconds() < 60);
    }

    #[test]
    fn jitter_differs_across_descriptors_in_general() {
        let a = descriptor("m1");
        let b = descriptor("m2");
        // Not a strict guarantee, but collisions across two inputs are
        // unlikely enough that this documents the intended behavior.
        assert_ne!(a.jitter_seconds(), b.jitter_seconds());
    }
}
