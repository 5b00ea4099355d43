//! Challenge-response auth endpoints.

use crate::auth::middleware::{session_cookie, AppState, SessionContext};
use crate::auth::session::generate_nonce;
use crate::auth::verify::verify_message;
use crate::error::AppError;
use crate::models::VerifyRequest;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

/// Attach the session cookie when the store issued a new id this request.
fn with_session_cookie(jar: CookieJar, state: &AppState, ctx: &SessionContext) -> CookieJar {
    if ctx.set_cookie {
        jar.add(session_cookie(&state.config, &ctx.id))
    } else {
        jar
    }
}

/// GET /nonce — issue a fresh challenge for this session.
///
/// Overwrites any previous unconsumed nonce: only the latest challenge is
/// ever acceptable.
pub async fn nonce(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: SessionContext,
) -> Result<(CookieJar, String), AppError> {
    let nonce = generate_nonce();
    {
        let mut record = ctx.record.lock().await;
        record.pending_nonce = Some(nonce.clone());
    }

    tracing::debug!(action = "nonce_issued", session = %ctx.id, "Challenge issued");

    let jar = with_session_cookie(jar, &state, &ctx);
    Ok((jar, nonce))
}

/// POST /verify — check a signed sign-in message against the pending nonce.
///
/// The record stays locked across the nonce check and the state transition,
/// so concurrent attempts against one session serialize and the nonce is
/// consumed at most once.
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: SessionContext,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<(CookieJar, StatusCode), AppError> {
    let Json(request) = body.map_err(|_| {
        AppError::MalformedRequest("Expected message and signature as JSON body.".to_string())
    })?;

    let mut record = ctx.record.lock().await;
    match verify_message(
        &request.message,
        &request.signature,
        record.pending_nonce.as_deref(),
        Utc::now(),
    ) {
        Ok(outcome) => {
            tracing::info!(action = "auth_success", session = %ctx.id, address = %outcome.address, "Wallet authenticated");
            record.authenticate(outcome);

            let jar = with_session_cookie(jar, &state, &ctx);
            Ok((jar, StatusCode::OK))
        }
        Err(err) => {
            // Failed attempt discards the challenge; a retry needs a fresh nonce
            record.discard_challenge();
            tracing::warn!(action = "auth_failed", session = %ctx.id, reason = %err, "Verification failed");
            Err(err.into())
        }
    }
}

/// GET /personal_information — protected resource echoing the verified address.
pub async fn personal_information(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: SessionContext,
) -> Result<(CookieJar, String), AppError> {
    let record = ctx.record.lock().await;
    let address = record
        .current_address(Utc::now())
        .ok_or_else(|| AppError::Unauthenticated("You have to first sign in".to_string()))?;
    drop(record);

    let jar = with_session_cookie(jar, &state, &ctx);
    Ok((
        jar,
        format!(
            "You are authenticated and your address is: {}",
            address.to_checksum(None)
        ),
    ))
}

/// POST /disconnect — clear authentication state (idempotent).
pub async fn disconnect(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: SessionContext,
) -> Result<(CookieJar, StatusCode), AppError> {
    {
        let mut record = ctx.record.lock().await;
        record.disconnect();
    }

    tracing::info!(action = "disconnect", session = %ctx.id, "Session disconnected");

    let jar = with_session_cookie(jar, &state, &ctx);
    Ok((jar, StatusCode::NO_CONTENT))
}
