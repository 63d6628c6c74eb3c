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

//! The HTTP binding (SPEC_FULL.md §6): wires the storage/executor/watch/
//! mirror engines into one `axum::Router` and serves it.

pub mod api;
pub mod auth;
pub mod error;
pub mod state;

use anyhow::Context;
use dogma_core::{Author, Change, CommitMessage, DogmaConfig, EntryContent, Revision};
use dogma_crypto::{generate_wdek, open_wdek, BlobCipher, InMemoryKekProvider, KekProvider, Wdek};
use dogma_executor::{CommandExecutor, LocalReplicationLog};
use dogma_mirror::{MirrorScheduler, MirrorSchedulerConfig};
use dogma_watch::WatchEngine;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, ACCESS_CONTROL_PROJECT, CREDENTIAL_KEY_PATH};

/// Boots every engine, ensures the reserved system project exists, builds
/// the router, and serves it until a shutdown signal arrives.
pub async fn run_server(config: DogmaConfig) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;

    let replication = Arc::new(LocalReplicationLog::new());
    let kek_provider: Arc<dyn dogma_crypto::KekProvider> = Arc::new(InMemoryKekProvider::new());
    let executor = CommandExecutor::new(replication, Arc::clone(&kek_provider));
    let executor_handle = executor.start();

    ensure_system_project(&executor).await?;
    let credential_cipher = ensure_credential_key(&executor, kek_provider.as_ref()).await?;

    let watch_engine = Arc::new(WatchEngine::new(config.server.watch_policy_max_ms));

    let mirror_config = MirrorSchedulerConfig {
        worker_pool_size: config.mirror.worker_pool_size,
        tick_interval: Duration::from_secs(config.mirror.tick_interval_secs),
        max_num_files: config.mirror.max_num_files,
        max_num_bytes: config.mirror.max_num_bytes,
        scratch_dir: config.mirror.scratch_dir.clone(),
        current_zone: config.mirror.current_zone.clone(),
        declared_zones: config.mirror.declared_zones.clone(),
        access_control_project: ACCESS_CONTROL_PROJECT.to_string(),
        credential_cipher: Arc::clone(&credential_cipher),
    };
    let mirror_scheduler = MirrorScheduler::new(Arc::clone(&executor), mirror_config);
    let mirror_handle = mirror_scheduler.start();

    let addr = config.socket_addr()?;
    let app_state = Arc::new(AppState {
        executor: Arc::clone(&executor),
        watch_engine,
        mirror_scheduler: Arc::clone(&mirror_scheduler),
        kek_provider,
        credential_cipher,
        config: config.clone(),
    });

    let app = api::router(app_state)
        .layer(if config.server.enable_cors() {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "starting dogma-server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!(error = %e, "http server exited with error");
        }
    });

    server_handle.await?;
    mirror_scheduler.stop().await;
    mirror_handle.abort();
    executor.stop();
    let _ = executor_handle.await;

    Ok(())
}

/// Creates the reserved `dogma-system` project (and its meta-repository,
/// implicitly, the first time anything is written under it) if it does
/// not already exist. It holds server-wide resources that have no natural
/// per-project home: the mirror access-control rule list and the
/// credential-encryption DEK header.
async fn ensure_system_project(executor: &Arc<CommandExecutor>) -> anyhow::Result<()> {
    let author = Author::system("dogma-server");
    match executor
        .create_project(author, ACCESS_CONTROL_PROJECT)
        .await
    {
        Ok(()) | Err(dogma_executor::ExecutorError::ProjectAlreadyExists(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Bootstraps (or reloads) the server-wide credential cipher used to seal
/// mirror credentials at rest (SPEC_FULL.md §2 "D ... uses E for stored
/// credentials"). The wrapped key is itself recorded as an ordinary entry
/// in the reserved system project's meta-repository, the same way a
/// repository's own WDEK would be, so it survives a restart without
/// needing a separate keystore file.
async fn ensure_credential_key(
    executor: &Arc<CommandExecutor>,
    kek_provider: &dyn KekProvider,
) -> anyhow::Result<Arc<dyn BlobCipher>> {
    let log = executor.commit_log(ACCESS_CONTROL_PROJECT, dogma_core::META_REPOSITORY_NAME)?;
    if !log.is_empty() {
        if let Ok(entry) = log.get(Revision::HEAD, CREDENTIAL_KEY_PATH) {
            if let Some(json) = entry.content.as_json() {
                let wdek: Wdek = serde_json::from_value(json.clone())
                    .context("malformed credential key record")?;
                let cipher = open_wdek(kek_provider, &wdek).context("cannot unwrap credential key")?;
                return Ok(Arc::new(cipher));
            }
        }
    }

    let (cipher, wdek) = generate_wdek(kek_provider).context("cannot generate credential key")?;
    let value = serde_json::to_value(&wdek)?;
    executor
        .push(
            Author::system("dogma-server"),
            ACCESS_CONTROL_PROJECT,
            dogma_core::META_REPOSITORY_NAME,
            Revision::HEAD,
            CommitMessage::summary_only("Generate credential encryption key".to_string()),
            vec![Change::upsert(CREDENTIAL_KEY_PATH.to_string(), EntryContent::Json(value))],
        )
        .await
        .context("cannot persist credential key")?;
    Ok(Arc::new(cipher))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
