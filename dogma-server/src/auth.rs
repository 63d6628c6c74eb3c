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

//! Request authentication (SPEC_FULL.md §8 scenario 6: "session cookies
//! issued during read-only mode carry a signed JWT"). When
//! `config.auth.enabled` is false the middleware is a no-op and every
//! request is attributed to an anonymous system author, matching a
//! single-node development deployment.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use dogma_core::Author;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Signs a session token for `username`, valid for `ttl_secs` seconds from
/// `now_millis`.
pub fn issue_token(secret: &str, username: &str, now_millis: i64, ttl_secs: i64) -> anyhow::Result<String> {
    let claims = Claims {
        sub: username.to_string(),
        exp: now_millis / 1000 + ttl_secs,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Attached to the request as an extension once authentication succeeds
/// (or is skipped, in which case it carries the anonymous system author).
#[derive(Clone)]
pub struct AuthenticatedUser(pub Author);

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.config.auth.enabled {
        request
            .extensions_mut()
            .insert(AuthenticatedUser(Author::system("anonymous")));
        return Ok(next.run(request).await);
    }

    let Some(secret) = state.config.auth.jwt_secret.as_deref() else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(Author::new(data.claims.sub)));
    Ok(next.run(request).await)
}
