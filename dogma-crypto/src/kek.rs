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

//! The Key Encryption Key boundary (SPEC_FULL.md §4.E.1): a small trait so
//! a real KEK (an HSM, a cloud KMS) stays external to this process, with
//! one in-memory implementation for tests and single-node deployments.

use crate::cipher::{aes_decrypt, aes_encrypt};
use crate::error::CryptoError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A key wrapped under some `kek_id`: nonce‖ciphertext‖tag, plus the id of
/// the KEK that produced it so rotation knows what to unwrap under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    pub kek_id: String,
    pub wrapped: Vec<u8>,
}

/// `KekProvider: wrap(key_id, plaintext) -> WrappedKey; unwrap(&WrappedKey)
/// -> plaintext` (SPEC_FULL.md §4.E.1). The actual KEK material never
/// leaves an implementation of this trait.
pub trait KekProvider: Send + Sync {
    fn current_kek_id(&self) -> String;
    fn wrap(&self, kek_id: &str, plaintext: &[u8; 32]) -> Result<WrappedKey, CryptoError>;
    fn unwrap(&self, wrapped: &WrappedKey) -> Result<[u8; 32], CryptoError>;
}

/// An in-memory `KekProvider` keyed by a process-local master secret.
/// Suitable for tests and single-node deployments; a production KEK is an
/// external collaborator per SPEC_FULL.md §1.
pub struct InMemoryKekProvider {
    current: String,
    keks: DashMap<String, [u8; 32]>,
}

impl InMemoryKekProvider {
    /// Generates a fresh provider with one KEK, `"local-1"`.
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut seed);
        let keks = DashMap::new();
        keks.insert("local-1".to_string(), seed);
        Self {
            current: "local-1".to_string(),
            keks,
        }
    }

    /// Adds a new KEK and makes it current, without discarding older ones
    /// (old-version wrapped keys stay unwrappable, per SPEC_FULL.md §4.E
    /// "old versions remain readable").
    pub fn rotate(&mut self, new_kek_id: impl Into<String>) {
        let id = new_kek_id.into();
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut seed);
        self.keks.insert(id.clone(), seed);
        self.current = id;
    }
}

impl Default for InMemoryKekProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KekProvider for InMemoryKekProvider {
    fn current_kek_id(&self) -> String {
        self.current.clone()
    }

    fn wrap(&self, kek_id: &str, plaintext: &[u8; 32]) -> Result<WrappedKey, CryptoError> {
        let kek = self
            .keks
            .get(kek_id)
            .ok_or_else(|| CryptoError::UnknownKek(kek_id.to_string()))?;
        let wrapped = aes_encrypt(&kek, plaintext);
        Ok(WrappedKey {
            kek_id: kek_id.to_string(),
            wrapped,
        })
    }

    fn unwrap(&self, wrapped: &WrappedKey) -> Result<[u8; 32], CryptoError> {
        let kek = self
            .keks
            .get(&wrapped.kek_id)
            .ok_or_else(|| CryptoError::UnknownKek(wrapped.kek_id.clone()))?;
        let plaintext = aes_decrypt(&kek, &wrapped.wrapped)?;
        plaintext
            .try_into()
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// Rewraps every key in `keys` under `provider`'s current KEK, logging and
/// skipping (not aborting) any individual failure (SPEC_FULL.md §4.E "KEK
/// rotation").
pub fn rewrap_batch<'a>(
    provider: &dyn KekProvider,
    keys: impl IntoIterator<Item = &'a mut WrappedKey>,
) -> usize {
    let new_kek_id = provider.current_kek_id();
    let mut rewrapped = 0;
    for key in keys {
        if key.kek_id == new_kek_id {
            continue;
        }
        match provider.unwrap(key) {
            Ok(plaintext) => match provider.wrap(&new_kek_id, &plaintext) {
                Ok(new_key) => {
                    *key = new_key;
                    rewrapped += 1;
                }
                Err(e) => tracing::error!(error = %e, "failed to rewrap key under new KEK"),
            },
            Err(e) => tracing::error!(error = %e, "failed to unwrap key for rotation"),
        }
    }
    rewrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_unwrap_round_trips() {
        let provider = InMemoryKekProvider::new();
        let dek = [7u8; 32];
        let wrapped = provider.wrap(&provider.current_kek_id(), &dek).unwrap();
        assert_eq!(provider.unwrap(&wrapped).unwrap(), dek);
    }

    #[test]
    fn rotation_preserves_old_versions() {
        let mut provider = InMemoryKekProvider::new();
        let dek = [9u8; 32];
        let old_wrapped = provider.wrap(&provider.current_kek_id(), &dek).unwrap();
        provider.rotate("local-2");

        let mut keys = vec![old_wrapped.clone()];
        let n = rewrap_batch(&provider, keys.iter_mut());
        assert_eq!(n, 1);
        assert_eq!(keys[0].kek_id, "local-2");
        assert_eq!(provider.unwrap(&keys[0]).unwrap(), dek);
        // The pre-rotation wrapping is still independently readable under
        // the old KEK id (it was never deleted from the provider).
        assert_eq!(provider.unwrap(&old_wrapped).unwrap(), dek);
    }
}
