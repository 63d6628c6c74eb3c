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

//! Server-wide status (SPEC_FULL.md §6 `GET/PATCH /status`; §4.B "Scope of
//! status updates"). `PATCH` defaults to a replicated (`ALL`) update unless
//! the caller asks for `scope: LOCAL`.

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use dogma_executor::StatusScope;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status).patch(set_status))
}

#[derive(Serialize)]
struct StatusView {
    writable: bool,
    replicating: bool,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    Json(StatusView {
        writable: state.executor.is_writable(),
        replicating: state.executor.is_replicating(),
    })
}

#[derive(Deserialize)]
struct SetStatusRequest {
    writable: bool,
    replicating: bool,
    #[serde(default)]
    scope: RequestScope,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
enum RequestScope {
    #[default]
    All,
    Local,
}

async fn set_status(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(author)): Extension<AuthenticatedUser>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<StatusView>, ApiError> {
    let scope = match req.scope {
        RequestScope::All => StatusScope::All,
        RequestScope::Local => StatusScope::Local,
    };
    state
        .executor
        .set_server_status(author, scope, req.writable, req.replicating)
        .await?;
    Ok(Json(StatusView {
        writable: state.executor.is_writable(),
        replicating: state.executor.is_replicating(),
    }))
}
