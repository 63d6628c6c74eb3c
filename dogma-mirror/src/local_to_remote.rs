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

//! `LOCAL_TO_REMOTE` mirroring (SPEC_FULL.md §4.D "Per-direction
//! algorithms"): materialize the local head tree into a throwaway working
//! copy, commit it, and push to the remote branch; a non-fast-forward push
//! fails the task rather than forcing, so the next tick retries cleanly
//! (SPEC_FULL.md §4.D.1 "throwaway working tree... per run").

use crate::credential::Credential;
use crate::descriptor::MirrorDescriptor;
use crate::error::MirrorError;
use crate::state::{MirrorState, STATE_FILE_PATH};
use crate::task::TaskStatus;
use dogma_core::{Author, Change, CommitMessage, EntryContent, Revision};
use dogma_executor::CommandExecutor;
use dogma_storage::FindOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Writes `entries` under `workdir`, stages and commits them on
/// `descriptor.remote_branch`, fetches+pushes against `descriptor.remote_uri`,
/// and returns the new remote commit id. All libgit2 calls are synchronous
/// and run off the async executor via `spawn_blocking` by the caller.
fn commit_and_push(
    descriptor: &MirrorDescriptor,
    credential: Option<&Credential>,
    workdir: &Path,
    entries: &[(String, Vec<u8>)],
    revision: i32,
) -> Result<String, MirrorError> {
    std::fs::create_dir_all(workdir)?;
    let repo = git2::Repository::init(workdir)?;

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
        // A branch that does not exist yet on the remote is not an error:
        // this may be the very first push.
        let _ = remote.fetch(&[refspec], Some(&mut fetch_opts), None);
    }

    let parent = repo
        .find_reference(&format!("refs/remotes/origin/{}", descriptor.remote_branch))
        .ok()
        .and_then(|r| r.peel_to_commit().ok());

    for (rel_path, bytes) in entries {
        let full = workdir.join(rel_path);
        if let Some(parent_dir) = full.parent() {
            std::fs::create_dir_all(parent_dir)?;
        }
        std::fs::write(&full, bytes)?;
    }

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_oid = index.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;

    let signature = git2::Signature::now("Mirror", "mirror@dogma.local")?;
    let message = format!("Mirror local revision r{revision}");
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let commit_oid = repo.commit(None, &signature, &signature, &message, &tree, &parents)?;

    let local_ref = format!("refs/heads/{}", descriptor.remote_branch);
    repo.reference(&local_ref, commit_oid, true, "mirror commit")?;

    let mut remote = repo.find_remote("origin")?;
    let rejected: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let rejected_cb = Arc::clone(&rejected);
    let mut callbacks = match credential {
        Some(credential) => credential.git2_callbacks(),
        None => git2::RemoteCallbacks::new(),
    };
    callbacks.push_update_reference(move |_refname, status| {
        if let Some(msg) = status {
            *rejected_cb.lock().unwrap() = Some(msg.to_string());
        }
        Ok(())
    });
    let mut push_opts = git2::PushOptions::new();
    push_opts.remote_callbacks(callbacks);
    let refspec = format!("{local_ref}:refs/heads/{}", descriptor.remote_branch);
    remote.push(&[refspec], Some(&mut push_opts))?;

    if rejected.lock().unwrap().take().is_some() {
        return Err(MirrorError::NonFastForward);
    }

    Ok(commit_oid.to_string())
}

pub async fn sync_local_to_remote(
    executor: Arc<CommandExecutor>,
    project: String,
    descriptor: MirrorDescriptor,
    credential: Option<Credential>,
    scratch_root: PathBuf,
) -> Result<TaskStatus, MirrorError> {
    let local_path = descriptor.local_path.trim_end_matches('/').to_string();
    let state_path = format!("{local_path}{}", STATE_FILE_PATH);

    let log = executor.commit_log(&project, &descriptor.local_repo)?;
    let head = log.head();

    let previous_state = match log.get(Revision::HEAD, &state_path) {
        Ok(entry) => entry
            .content
            .as_json()
            .and_then(|j| serde_json::from_value::<MirrorState>(j.clone()).ok())
            .unwrap_or_default(),
        Err(_) => MirrorState::default(),
    };
    if previous_state.local_revision == Some(head) {
        return Ok(TaskStatus::NoOp {
            description: format!("local repository unchanged at revision {head}"),
        });
    }

    let entries = log.find(
        Revision::HEAD,
        &format!("{local_path}/**"),
        FindOptions {
            fetch_content: true,
            max_entries: None,
        },
    )?;

    let mut files = Vec::new();
    for entry in &entries {
        if entry.path == state_path {
            continue;
        }
        let rel = entry
            .path
            .trim_start_matches(&local_path)
            .trim_start_matches('/')
            .to_string();
        let bytes = entry
            .content
            .to_bytes()
            .map_err(|e| MirrorError::CorruptState(e.to_string()))?;
        files.push((rel, bytes));
    }

    let workdir = scratch_root.join(format!("{}-push", descriptor.id));
    let descriptor_for_blocking = descriptor.clone();
    let files_for_blocking = files.clone();
    let remote_oid = tokio::task::spawn_blocking(move || {
        commit_and_push(
            &descriptor_for_blocking,
            credential.as_ref(),
            &workdir,
            &files_for_blocking,
            head,
        )
    })
    .await
    .map_err(|e| MirrorError::CorruptState(format!("mirror task panicked: {e}")))??;

    let new_state = MirrorState {
        source_revision: Some(remote_oid.clone()),
        remote_revision: Some(remote_oid),
        remote_path: Some(descriptor.remote_path.clone()),
        local_revision: Some(head),
        local_path: Some(descriptor.local_path.clone()),
    };
    executor
        .push(
            Author::system("Mirror"),
            &project,
            &descriptor.local_repo,
            Revision::HEAD,
            CommitMessage::summary_only(format!("Record mirror state for revision {head}")),
            vec![Change::upsert(state_path, EntryContent::Json(new_state.to_json()))],
        )
        .await?;

    Ok(TaskStatus::Success {
        description: format!("pushed local revision {head} to {}", descriptor.remote_uri),
    })
}
