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

//! The Encryption Layer (SPEC_FULL.md §4.E): AES-256-GCM entry and
//! key-wrap cipher, an external-KEK boundary, versioned session keys, and
//! the wrapped-DEK header recorded alongside an encrypted repository.

pub mod cipher;
pub mod dek;
pub mod error;
pub mod kek;
pub mod session;

pub use cipher::{BlobCipher, DekCipher};
pub use dek::{generate_wdek, open_wdek, Wdek};
pub use error::CryptoError;
pub use kek::{rewrap_batch, InMemoryKekProvider, KekProvider, WrappedKey};
pub use session::{SessionKey, SessionKeyStore};
