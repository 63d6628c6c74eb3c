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

//! A repository's Data Encryption Key, wrapped under the process KEK
//! (SPEC_FULL.md §4.E: "the wrapped DEK (WDEK) is recorded with the
//! repository"; the WDEK header carries `(version, kekId)`, §6).

use crate::cipher::DekCipher;
use crate::error::CryptoError;
use crate::kek::{KekProvider, WrappedKey};
use serde::{Deserialize, Serialize};

/// A repository's wrapped DEK, as recorded alongside the repository
/// (SPEC_FULL.md §6 "the WDEK header carries `(version, kekId)`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wdek {
    pub version: u32,
    pub wrapped: WrappedKey,
}

/// Generates a fresh DEK and wraps it under `provider`'s current KEK,
/// returning both the usable cipher and the header to persist
/// (SPEC_FULL.md §4.E "Migration to encrypted", step 1).
pub fn generate_wdek(provider: &dyn KekProvider) -> Result<(DekCipher, Wdek), CryptoError> {
    let dek = DekCipher::generate();
    let wrapped = provider.wrap(&provider.current_kek_id(), &dek)?;
    Ok((
        DekCipher::new(dek),
        Wdek {
            version: 1,
            wrapped,
        },
    ))
}

/// Unwraps a previously-recorded WDEK back into a usable cipher.
pub fn open_wdek(provider: &dyn KekProvider, wdek: &Wdek) -> Result<DekCipher, CryptoError> {
    let dek = provider.unwrap(&wdek.wrapped)?;
    Ok(DekCipher::new(dek))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kek::InMemoryKekProvider;
    use crate::cipher::BlobCipher;

    #[test]
    fn generated_wdek_can_be_reopened() {
        let provider = InMemoryKekProvider::new();
        let (cipher, wdek) = generate_wdek(&provider).unwrap();
        let sealed = cipher.encrypt(b"hello");
        let reopened = open_wdek(&provider, &wdek).unwrap();
        assert_eq!(reopened.decrypt(&sealed).unwrap(), b"hello");
    }
}
