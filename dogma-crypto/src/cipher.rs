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

//! AES-256-GCM entry and key-wrap cipher (SPEC_FULL.md §4.E.1). A random
//! 96-bit nonce is generated per encryption and stored as
//! `nonce‖ciphertext‖tag`, since GCM is catastrophically broken under nonce
//! reuse and nothing in this scope can otherwise guarantee uniqueness
//! across process restarts.

use crate::error::CryptoError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

const NONCE_LEN: usize = 12;

pub(crate) fn aes_encrypt(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .expect("AES-256-GCM encryption is infallible for in-memory buffers");
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    out
}

pub(crate) fn aes_decrypt(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::Truncated);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// The storage-facing seam (SPEC_FULL.md §9 "composition of small traits"):
/// `dogma-storage` depends on this trait, not on AES-GCM directly, so the
/// cipher used for entry bytes at rest can be swapped without touching the
/// commit log.
pub trait BlobCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// A single repository's Data Encryption Key, unwrapped and held in memory
/// for the lifetime of an open, encrypted repository.
pub struct DekCipher {
    key: [u8; 32],
}

impl DekCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Generates a fresh, random 256-bit DEK.
    pub fn generate() -> [u8; 32] {
        let mut key = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key);
        key
    }
}

impl BlobCipher for DekCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        aes_encrypt(&self.key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        aes_decrypt(&self.key, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = DekCipher::generate();
        let cipher = DekCipher::new(key);
        let plaintext = b"{\"x\":1}";
        let ciphertext = cipher.encrypt(plaintext);
        assert_ne!(ciphertext, plaintext);
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let cipher = DekCipher::new(DekCipher::generate());
        assert!(matches!(cipher.decrypt(&[1, 2, 3]), Err(CryptoError::Truncated)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let cipher = DekCipher::new(DekCipher::generate());
        let mut sealed = cipher.encrypt(b"hello world");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(cipher.decrypt(&sealed), Err(CryptoError::DecryptionFailed)));
    }

    proptest! {
        #[test]
        fn round_trips_for_arbitrary_plaintext(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cipher = DekCipher::new(DekCipher::generate());
            let sealed = cipher.encrypt(&bytes);
            prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), bytes);
        }
    }
}
