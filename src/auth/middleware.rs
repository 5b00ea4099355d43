//! Axum extractors for session context.

use crate::config::Config;
use crate::error::AppError;
use crate::models::SessionRecord;
use crate::storage::session::SessionStore;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

/// Session context extractor.
///
/// Reads the session cookie and resolves it against the store; a session is
/// created implicitly on first contact. Never fails a request; protected
/// handlers decide what an unauthenticated session means.
pub struct SessionContext {
    pub id: String,
    pub record: Arc<Mutex<SessionRecord>>,
    /// True when the resolved id differs from what the client presented,
    /// i.e. the response must (re)issue the session cookie.
    pub set_cookie: bool,
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let presented = jar
            .get(&state.config.cookie_name)
            .map(|cookie| cookie.value().to_string());

        let (id, record) = state.sessions.resolve(presented.as_deref()).await;
        let set_cookie = presented.as_deref() != Some(id.as_str());

        Ok(SessionContext {
            id,
            record,
            set_cookie,
        })
    }
}

/// Build the session cookie carrying an issued session id.
pub fn session_cookie(config: &Config, id: &str) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), id.to_owned()))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build()
}
