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

//! Versioned session keys used to sign/verify session cookies
//! (SPEC_FULL.md §4.E "Session keys"). Old versions stay readable
//! indefinitely so a cookie issued before a rotation still verifies.

use crate::error::CryptoError;
use crate::kek::{KekProvider, WrappedKey};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// One versioned session key: a wrapped master key plus the salt it was
/// derived with.
#[derive(Debug, Clone)]
pub struct SessionKey {
    pub version: u32,
    pub master_wrapped: WrappedKey,
    pub salt: [u8; 16],
}

/// Holds every live session key version and tracks which one is current
/// (the `session/master/current` record of SPEC_FULL.md §6).
pub struct SessionKeyStore {
    versions: DashMap<u32, SessionKey>,
    current: AtomicU32,
}

impl SessionKeyStore {
    /// Bootstraps the store with version 1, wrapped under `provider`'s
    /// current KEK.
    pub fn new(provider: &dyn KekProvider) -> Result<Self, CryptoError> {
        let store = Self {
            versions: DashMap::new(),
            current: AtomicU32::new(0),
        };
        store.rotate(provider)?;
        Ok(store)
    }

    pub fn current_version(&self) -> u32 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn get(&self, version: u32) -> Result<SessionKey, CryptoError> {
        self.versions
            .get(&version)
            .map(|e| e.clone())
            .ok_or(CryptoError::UnknownSessionVersion(version))
    }

    pub fn current(&self) -> SessionKey {
        self.get(self.current_version())
            .expect("current version is always present once initialized")
    }

    /// Writes a new session key version — a strict successor of the
    /// current one — and atomically repoints the current-version pointer.
    /// Old versions are left untouched and remain decryptable.
    pub fn rotate(&self, provider: &dyn KekProvider) -> Result<u32, CryptoError> {
        let new_version = self.current_version() + 1;
        let master = crate::cipher::DekCipher::generate();
        let mut salt = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
        let master_wrapped = provider.wrap(&provider.current_kek_id(), &master)?;
        self.versions.insert(
            new_version,
            SessionKey {
                version: new_version,
                master_wrapped,
                salt,
            },
        );
        self.current.store(new_version, Ordering::SeqCst);
        Ok(new_version)
    }

    /// Rewraps every stored version's master key under the KEK's current
    /// id (SPEC_FULL.md §4.E "KEK rotation"); per-key failures are logged
    /// and skipped rather than aborting the whole batch.
    pub fn rewrap_all_under_current_kek(&self, provider: &dyn KekProvider) -> usize {
        let mut keys: Vec<WrappedKey> = self
            .versions
            .iter()
            .map(|e| e.master_wrapped.clone())
            .collect();
        let rewrapped = crate::kek::rewrap_batch(provider, keys.iter_mut());
        for (i, entry) in self.versions.iter().enumerate() {
            if let Some(new_key) = keys.get(i) {
                self.versions
                    .get_mut(entry.key())
                    .map(|mut v| v.master_wrapped = new_key.clone());
            }
        }
        rewrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kek::InMemoryKekProvider;

    #[test]
    fn bootstraps_at_version_one() {
        let provider = InMemoryKekProvider::new();
        let store = SessionKeyStore::new(&provider).unwrap();
        assert_eq!(store.current_version(), 1);
    }

    #[test]
    fn rotation_is_a_strict_successor_and_keeps_old_versions_readable() {
        let provider = InMemoryKekProvider::new();
        let store = SessionKeyStore::new(&provider).unwrap();
        let v1 = store.current();
        let new_version = store.rotate(&provider).unwrap();
        assert_eq!(new_version, 2);
        assert_eq!(store.current_version(), 2);
        // version 1 is still fetchable.
        let fetched_v1 = store.get(1).unwrap();
        assert_eq!(fetched_v1.master_wrapped, v1.master_wrapped);
    }
}
