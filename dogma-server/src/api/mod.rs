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

//! One `Router` per resource family, merged under `/api/v1`
//! (SPEC_FULL.md §6.1).

pub mod access;
pub mod contents;
pub mod credentials;
pub mod health;
pub mod mirrors;
pub mod projects;
pub mod status;

use crate::auth::auth_middleware;
use crate::state::AppState;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(projects::router())
        .merge(contents::router())
        .merge(mirrors::router())
        .merge(credentials::router())
        .merge(status::router())
        .merge(access::router())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .with_state(state)
}
