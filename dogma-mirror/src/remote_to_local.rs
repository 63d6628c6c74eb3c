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

//! `REMOTE_TO_LOCAL` mirroring (SPEC_FULL.md §4.D "Per-direction
//! algorithms"): fetch the remote branch, diff it against the sentinel
//! recorded from the last successful sync, and commit the delta locally.

use crate::credential::Credential;
use crate::descriptor::MirrorDescriptor;
use crate::error::MirrorError;
use crate::gitignore::Gitignore;
use crate::state::{MirrorState, STATE_FILE_PATH};
use crate::task::TaskStatus;
use dogma_core::{Author, Change, CommitMessage, EntryContent, EntryType, Revision};
use dogma_executor::CommandExecutor;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Remote blob content collected for one path, relative to `remotePath`.
struct RemoteFile {
    rel_path: String,
    bytes: Vec<u8>,
}

/// Clones or fetches `descriptor.remote_uri` into a bare scratch repository
/// dedicated to this descriptor, and returns the remote branch's head
/// commit together with every blob under `remotePath` (SPEC_FULL.md
/// §4.D.1: libgit2, synchronous, run off the async executor via
/// `spawn_blocking`).
fn fetch_remote_tree(
    descriptor: &MirrorDescriptor,
    credential: Option<&Credential>,
    scratch_dir: &Path,
) -> Result<(String, Vec<RemoteFile>), MirrorError> {
    std::fs::create_dir_all(scratch_dir)?;
    let repo = match git2::Repository::open_bare(scratch_dir) {
        Ok(repo) => repo,
        Err(_) => git2::Repository::init_bare(scratch_dir)?,
    };

    {
        let mut remote = match repo.find_remote("origin") {
            Ok(remote) => remote,
            Err(_) => repo.remote("origin", &descriptor.remote_uri)?,
        };
        let refspec = format!(
            "+refs/heads/{branch}:refs/remotes/origin/{branch}",
            branch = descriptor.remote_branch
        );
        let mut fetch_opts = git2::FetchOptions::new();
        if let Some(credential) = credential {
            fetch_opts.remote_callbacks(credential.git2_callbacks());
        }
        remote.fetch(&[refspec], Some(&mut fetch_opts), None)?;
    }

    let reference = repo.find_reference(&format!(
        "refs/remotes/origin/{}",
        descriptor.remote_branch
    ))?;
    let commit = reference.peel_to_commit()?;
    let head_oid = commit.id().to_string();
    let tree = commit.tree()?;

    let root = descriptor.remote_path.trim_matches('/');
    let subtree = if root.is_empty() {
        tree
    } else {
        let entry = tree
            .get_path(Path::new(root))
            .map_err(|_| MirrorError::NotFound(descriptor.remote_path.clone()))?;
        entry
            .to_object(&repo)?
            .into_tree()
            .map_err(|_| MirrorError::NotFound(format!("{} is not a directory", root)))?
    };

    let mut files = Vec::new();
    subtree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return git2::TreeWalkResult::Ok;
        }
        let Some(name) = entry.name() else {
            return git2::TreeWalkResult::Ok;
        };
        let rel = if dir.is_empty() {
            name.to_string()
        } else {
            format!("{}{}", dir.trim_end_matches('/'), format!("/{name}"))
        };
        if let Ok(blob) = repo.find_blob(entry.id()) {
            files.push(RemoteFile {
                rel_path: rel,
                bytes: blob.content().to_vec(),
            });
        }
        git2::TreeWalkResult::Ok
    })?;

    Ok((head_oid, files))
}

fn entry_type_for(path: &str) -> EntryType {
    if path.ends_with(".json") {
        EntryType::Json
    } else if path.ends_with(".yml") || path.ends_with(".yaml") {
        EntryType::Yaml
    } else {
        EntryType::Text
    }
}

fn content_for(entry_type: EntryType, bytes: &[u8]) -> Result<EntryContent, MirrorError> {
    EntryContent::from_bytes(entry_type, bytes)
        .map_err(|e| MirrorError::CorruptState(format!("invalid {entry_type:?} content: {e}")))
}

pub async fn sync_remote_to_local(
    executor: Arc<CommandExecutor>,
    project: String,
    descriptor: MirrorDescriptor,
    credential: Option<Credential>,
    scratch_root: PathBuf,
    max_num_files: usize,
    max_num_bytes: u64,
) -> Result<TaskStatus, MirrorError> {
    let scratch_dir = scratch_root.join(&descriptor.id);
    let descriptor_for_blocking = descriptor.clone();
    let (head_oid, remote_files) = tokio::task::spawn_blocking(move || {
        fetch_remote_tree(&descriptor_for_blocking, credential.as_ref(), &scratch_dir)
    })
    .await
    .map_err(|e| MirrorError::CorruptState(format!("mirror task panicked: {e}")))??;

    let local_path = descriptor.local_path.trim_end_matches('/');
    let state_path = format!("{local_path}{}", STATE_FILE_PATH);

    let log = executor.commit_log(&project, &descriptor.local_repo)?;
    let previous_state = match log.get(Revision::HEAD, &state_path) {
        Ok(entry) => match entry.content.as_json() {
            Some(json) => serde_json::from_value(json.clone())
                .map_err(|e| MirrorError::CorruptState(e.to_string()))?,
            None => MirrorState::default(),
        },
        Err(_) => MirrorState::default(),
    };

    if previous_state.remote_revision.as_deref() == Some(head_oid.as_str()) {
        return Ok(TaskStatus::NoOp {
            description: format!("remote unchanged at {head_oid}"),
        });
    }

    let gitignore = Gitignore::parse(descriptor.gitignore.as_deref().unwrap_or(""));

    let mut total_bytes: u64 = 0;
    let mut desired: BTreeMap<String, (EntryType, Vec<u8>)> = BTreeMap::new();
    for file in remote_files {
        if gitignore.is_ignored(&file.rel_path) {
            continue;
        }
        if dogma_core::pattern::validate_path(&format!("/{}", file.rel_path)).is_err() {
            continue;
        }
        if desired.len() >= max_num_files {
            return Err(MirrorError::BudgetExceeded(format!(
                "more than {max_num_files} files under {}",
                descriptor.remote_path
            )));
        }
        total_bytes += file.bytes.len() as u64;
        if total_bytes > max_num_bytes {
            return Err(MirrorError::BudgetExceeded(format!(
                "more than {max_num_bytes} bytes under {}",
                descriptor.remote_path
            )));
        }
        let entry_type = entry_type_for(&file.rel_path);
        desired.insert(file.rel_path, (entry_type, file.bytes));
    }

    let existing = log.find(
        Revision::HEAD,
        &format!("{local_path}/**"),
        dogma_storage::FindOptions {
            fetch_content: false,
            max_entries: None,
        },
    )?;

    let mut changes = Vec::new();
    for (rel_path, (entry_type, bytes)) in &desired {
        let full_path = format!("{local_path}/{rel_path}");
        let content = content_for(*entry_type, bytes)?;
        let unchanged = existing
            .iter()
            .any(|e| e.path == full_path)
            && log
                .get(Revision::HEAD, &full_path)
                .map(|e| e.content == content)
                .unwrap_or(false);
        if !unchanged {
            changes.push(Change::upsert(full_path, content));
        }
    }
    for entry in &existing {
        if entry.path == state_path {
            continue;
        }
        let rel = entry.path.trim_start_matches(local_path).trim_start_matches('/');
        if !desired.contains_key(rel) {
            changes.push(Change::remove(entry.path.clone()));
        }
    }

    let new_state = MirrorState {
        source_revision: Some(head_oid.clone()),
        remote_revision: Some(head_oid.clone()),
        remote_path: Some(descriptor.remote_path.clone()),
        local_revision: None,
        local_path: Some(descriptor.local_path.clone()),
    };
    changes.push(Change::upsert(
        state_path,
        EntryContent::Json(new_state.to_json()),
    ));

    let files_changed = changes.len() - 1;
    executor
        .push(
            Author::system("Mirror"),
            &project,
            &descriptor.local_repo,
            Revision::HEAD,
            CommitMessage::summary_only(format!(
                "Mirror {} from {} ({})",
                descriptor.remote_branch, descriptor.remote_uri, head_oid
            )),
            changes,
        )
        .await?;

    Ok(TaskStatus::Success {
        description: format!("synced {files_changed} path(s) from remote revision {head_oid}"),
    })
}
