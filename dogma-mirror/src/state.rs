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

//! The `mirror_state.json` sentinel (SPEC_FULL.md §4.D "State tracking"):
//! one object per descriptor, committed into the local repository alongside
//! the content it describes so that it always travels with the revision it
//! was produced from.
//!
//! SPEC_FULL.md §9 resolves the Open Question of which fields are
//! authoritative: `remoteRevision`/`localRevision` are, because they are
//! read back on the next tick to decide whether either side has moved since
//! the last sync. `sourceRevision` is kept write-only, for readers written
//! against an older schema that only knew one revision field.

use serde::{Deserialize, Serialize};

pub const STATE_FILE_PATH: &str = "/mirror_state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorState {
    /// Write-only back-compat mirror of whichever of `remote_revision` /
    /// `local_revision` this sync direction produced; never read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_revision: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

impl MirrorState {
    pub fn parse(bytes: &[u8]) -> Result<Self, crate::error::MirrorError> {
        serde_json::from_slice(bytes)
            .map_err(|e| crate::error::MirrorError::CorruptState(e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("MirrorState always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let state = MirrorState {
            source_revision: Some("deadbeef".to_string()),
            remote_revision: Some("deadbeef".to_string()),
            remote_path: Some("/".to_string()),
            local_revision: Some(42),
            local_path: Some("/mirrors/foo".to_string()),
        };
        let bytes = serde_json::to_vec(&state).unwrap();
        let parsed = MirrorState::parse(&bytes).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let parsed = MirrorState::parse(b"{}").unwrap();
        assert_eq!(parsed, MirrorState::default());
    }

    #[test]
    fn corrupt_json_is_reported() {
        let err = MirrorState::parse(b"not json").unwrap_err();
        assert!(matches!(err, crate::error::MirrorError::CorruptState(_)));
    }
}
