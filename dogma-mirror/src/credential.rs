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

//! Mirror credentials (SPEC_FULL.md §3 "Project ... with ... credentials";
//! §6 reserved paths `/credentials/<id>.json`,
//! `/repos/<repo>/credentials/<id>.json`). Secret material never reaches a
//! commit in the clear: it is sealed under the server's credential cipher
//! (SPEC_FULL.md §2 "D ... uses E for stored credentials") before being
//! written, and only unsealed in memory for the duration of one mirror run.

use crate::error::MirrorError;
use dogma_crypto::{BlobCipher, CryptoError};
use dogma_executor::CommandExecutor;
use dogma_storage::FindOptions;
use dogma_core::{Revision, META_REPOSITORY_NAME};
use serde::{Deserialize, Serialize};

pub const PROJECT_CREDENTIAL_PATH_PATTERN: &str = "/credentials/*.json";
pub const REPO_CREDENTIAL_PATH_PATTERN: &str = "/repos/*/credentials/*.json";

pub fn project_credential_path(id: &str) -> String {
    format!("/credentials/{id}.json")
}

pub fn repo_credential_path(repo: &str, id: &str) -> String {
    format!("/repos/{repo}/credentials/{id}.json")
}

/// The plaintext shape of a credential, held only in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialSecret {
    None,
    Password { username: String, password: String },
    SshKey {
        username: String,
        private_key: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
    AccessToken { token: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    #[serde(flatten)]
    pub secret: CredentialSecret,
}

/// The at-rest shape of a [`Credential`]: everything but `id` is
/// AES-256-GCM-sealed under the credential cipher, hex-encoded so it can
/// live as an ordinary JSON string field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedCredential {
    pub id: String,
    pub sealed: String,
}

impl Credential {
    pub fn seal(&self, cipher: &dyn BlobCipher) -> Result<SealedCredential, CryptoError> {
        let plaintext =
            serde_json::to_vec(&self.secret).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        let sealed = cipher.encrypt(&plaintext);
        Ok(SealedCredential {
            id: self.id.clone(),
            sealed: hex::encode(sealed),
        })
    }

    pub fn open(sealed: &SealedCredential, cipher: &dyn BlobCipher) -> Result<Credential, CryptoError> {
        let bytes = hex::decode(&sealed.sealed).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        let plaintext = cipher.decrypt(&bytes)?;
        let secret: CredentialSecret =
            serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(Credential {
            id: sealed.id.clone(),
            secret,
        })
    }

    /// Builds the libgit2 auth callback for this credential's secret kind.
    /// `SSH_KEY` authenticates from the in-memory private key directly
    /// (no filesystem round-trip); `ACCESS_TOKEN` is presented the way
    /// most Git hosts expect: as the username with an empty password.
    pub fn git2_callbacks(&self) -> git2::RemoteCallbacks<'_> {
        let secret = self.secret.clone();
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, _allowed| match &secret {
            CredentialSecret::None => Err(git2::Error::from_str("credential has no secret configured")),
            CredentialSecret::Password { username, password } => {
                git2::Cred::userpass_plaintext(username, password)
            }
            CredentialSecret::AccessToken { token } => git2::Cred::userpass_plaintext(token, ""),
            CredentialSecret::SshKey {
                username,
                private_key,
                passphrase,
            } => {
                let user = if username.is_empty() {
                    username_from_url.unwrap_or("git")
                } else {
                    username.as_str()
                };
                git2::Cred::ssh_key_from_memory(user, None, private_key, passphrase.as_deref())
            }
        });
        callbacks
    }
}

/// Resolves `credential_id` for a mirror run (SPEC_FULL.md §6 reserved
/// paths): a repository-scoped entry shadows a project-scoped one of the
/// same id, matching how the rest of the meta-repository layers overrides.
pub fn load_credential(
    executor: &CommandExecutor,
    cipher: &dyn BlobCipher,
    project: &str,
    repo: &str,
    credential_id: &str,
) -> Result<Credential, MirrorError> {
    let log = executor.commit_log(project, META_REPOSITORY_NAME)?;
    let repo_path = repo_credential_path(repo, credential_id);
    let entry = match log.get(Revision::HEAD, &repo_path) {
        Ok(entry) => entry,
        Err(_) => log
            .get(Revision::HEAD, &project_credential_path(credential_id))
            .map_err(|_| MirrorError::CredentialNotFound(credential_id.to_string()))?,
    };
    let json = entry
        .content
        .as_json()
        .ok_or_else(|| MirrorError::CredentialNotFound(credential_id.to_string()))?;
    let sealed: SealedCredential = serde_json::from_value(json.clone())
        .map_err(|e| MirrorError::CorruptState(format!("malformed credential entry: {e}")))?;
    Credential::open(&sealed, cipher)
        .map_err(|e| MirrorError::CorruptState(format!("cannot unseal credential {credential_id}: {e}")))
}

/// Lists every credential visible to `project` (project-scoped plus every
/// repository-scoped entry), used by the credential CRUD API's listing
/// endpoint. Entries are returned sealed — callers that only need to
/// display metadata should not unseal unless the caller is authorized to
/// see secret material.
pub fn list_sealed_credentials(
    executor: &CommandExecutor,
    project: &str,
) -> Result<Vec<SealedCredential>, MirrorError> {
    let log = executor.commit_log(project, META_REPOSITORY_NAME)?;
    if log.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for pattern in [PROJECT_CREDENTIAL_PATH_PATTERN, REPO_CREDENTIAL_PATH_PATTERN] {
        let entries = log.find(
            Revision::HEAD,
            pattern,
            FindOptions {
                fetch_content: true,
                max_entries: None,
            },
        )?;
        for entry in entries {
            if let Some(json) = entry.content.as_json() {
                if let Ok(sealed) = serde_json::from_value::<SealedCredential>(json.clone()) {
                    out.push(sealed);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogma_crypto::{generate_wdek, open_wdek, InMemoryKekProvider};

    #[test]
    fn seal_then_open_round_trips_password_secret() {
        let provider = InMemoryKekProvider::new();
        let (cipher, wdek) = generate_wdek(&provider).unwrap();
        let credential = Credential {
            id: "github".to_string(),
            secret: CredentialSecret::Password {
                username: "bot".to_string(),
                password: "hunter2".to_string(),
            },
        };
        let sealed = credential.seal(&cipher).unwrap();
        assert_ne!(sealed.sealed, "hunter2");

        let reopened_cipher = open_wdek(&provider, &wdek).unwrap();
        let opened = Credential::open(&sealed, &reopened_cipher).unwrap();
        match opened.secret {
            CredentialSecret::Password { username, password } => {
                assert_eq!(username, "bot");
                assert_eq!(password, "hunter2");
            }
            other => panic!("unexpected secret kind: {other:?}"),
        }
    }

    #[test]
    fn tampering_with_sealed_hex_fails_to_open() {
        let provider = InMemoryKekProvider::new();
        let (cipher, _wdek) = generate_wdek(&provider).unwrap();
        let credential = Credential {
            id: "x".to_string(),
            secret: CredentialSecret::AccessToken {
                token: "ghp_abc".to_string(),
            },
        };
        let mut sealed = credential.seal(&cipher).unwrap();
        sealed.sealed.push_str("00");
        assert!(Credential::open(&sealed, &cipher).is_err());
    }
}
