// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login gate: a single operator account configured at startup.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::password_digest;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    username: String,
    #[validate(length(min = 1, max = 200))]
    password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Cookies are only marked `Secure` when the frontend is served over HTTPS,
/// so local development over plain HTTP keeps working.
fn session_cookie_secure(state: &AppState) -> bool {
    state.config.frontend_url.starts_with("https://")
}

/// Check credentials and open a session (cookie + bearer token).
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    body.validate()?;

    let username_ok: bool = body
        .username
        .as_bytes()
        .ct_eq(state.config.app_username.as_bytes())
        .into();
    let password_ok: bool = password_digest(&body.password)[..]
        .ct_eq(&state.config.app_password_sha256[..])
        .into();

    if !(username_ok && password_ok) {
        tracing::warn!(username = %body.username, "Rejected login attempt");
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(&state.config.app_username, &state.config.jwt_signing_key)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session_cookie_secure(&state));

    tracing::info!(username = %body.username, "Operator logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            username: state.config.app_username.clone(),
        }),
    ))
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let removal = Cookie::build(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session_cookie_secure(&state));

    (jar.remove(removal), StatusCode::NO_CONTENT)
}
