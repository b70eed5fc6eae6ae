//! Auth routes — session management, WS tickets, development login.
//!
//! OAuth is handled upstream; this server only trusts its own session
//! cookie. `POST /api/dev/login` mints a user and session directly and is
//! only routed to when `DEV_AUTH_BYPASS` is set.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::canvas::identity::Identity;
use crate::canvas::name::RoomName;
use crate::services::session;
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";
const SESSION_DAYS: i64 = 30;
const DEV_NAME_MAX_CHARS: usize = 32;

fn session_cookie(token: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub identity: Identity,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let identity = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session validation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { identity, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub owned_room: Option<RoomName>,
}

impl From<Identity> for MeResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.profile.id,
            name: identity.profile.name,
            avatar: identity.profile.avatar,
            owned_room: identity.owned_room,
        }
    }
}

/// `GET /api/auth/me` — return current user.
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(auth.identity.into())
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }

    let jar = CookieJar::new().add(session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO));
    (jar, StatusCode::NO_CONTENT)
}

/// `POST /api/auth/ws-ticket` — create a one-time WS ticket.
pub async fn ws_ticket(State(state): State<AppState>, auth: AuthUser) -> Result<Json<serde_json::Value>, StatusCode> {
    let ticket = session::create_ws_ticket(&state.pool, auth.identity.id())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "ws ticket creation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(serde_json::json!({ "ticket": ticket })))
}

#[derive(Debug, Deserialize)]
pub struct DevLoginBody {
    pub name: String,
}

/// Trimmed, length-capped display name; `None` when nothing is left.
pub(crate) fn dev_display_name(raw: &str) -> Option<String> {
    let name: String = raw.trim().chars().take(DEV_NAME_MAX_CHARS).collect();
    (!name.is_empty()).then_some(name)
}

/// `POST /api/dev/login` — create a user and session without OAuth.
///
/// Enabled only when `DEV_AUTH_BYPASS=true`.
pub async fn dev_login(State(state): State<AppState>, Json(body): Json<DevLoginBody>) -> Response {
    if !state.config.dev_auth_bypass {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(name) = dev_display_name(&body.name) else {
        return (StatusCode::BAD_REQUEST, "name required").into_response();
    };

    let user_id = match session::create_dev_user(&state.pool, &name).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "dev user creation failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let token = match session::create_session(&state.pool, user_id).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::info!(%user_id, %name, "dev login");
    let cookie = session_cookie(token, state.config.cookie_secure, Duration::days(SESSION_DAYS));
    let jar = CookieJar::new().add(cookie);
    (jar, Json(serde_json::json!({ "id": user_id, "name": name }))).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
