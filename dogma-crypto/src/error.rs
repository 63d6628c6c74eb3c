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

use thiserror::Error;

/// Encryption Layer error taxonomy (SPEC_FULL.md §4.E / §7
/// `EncryptionStorage`).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("ciphertext is too short to contain a nonce")]
    Truncated,
    #[error("decryption failed: authentication tag mismatch")]
    DecryptionFailed,
    #[error("unknown KEK id: {0}")]
    UnknownKek(String),
    #[error("session key version {0} is not registered")]
    UnknownSessionVersion(u32),
    #[error("rotation must strictly succeed the current version ({current})")]
    NonSuccessorRotation { current: u32 },
    #[error("repository already encrypted")]
    AlreadyEncrypted,
    #[error("repository has too many revisions to migrate ({0} >= 1000)")]
    TooManyRevisions(i32),
    #[error("repository is read-only")]
    ReadOnly,
    #[error("failed to (de)serialize sealed payload: {0}")]
    Serialization(String),
}
