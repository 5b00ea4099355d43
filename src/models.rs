//! Request models and server-side session state.

use crate::auth::message::SignInMessage;
use crate::auth::verify::VerificationResult;
use alloy_core::primitives::Address;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Body of `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String,
}

/// Identity bound to a session by a successful verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub address: Address,
    /// The full set of claims from the verified sign-in message.
    pub claims: SignInMessage,
}

/// Server-side state for one client session.
///
/// Invariant: `identity` is only ever set by `authenticate`, which consumes
/// the pending nonce in the same step; a nonce is usable at most once.
#[derive(Debug)]
pub struct SessionRecord {
    pub created_at: DateTime<Utc>,
    /// Default session policy until authentication; overwritten with the
    /// verified message's expiration claim when present.
    pub expires_at: DateTime<Utc>,
    pub pending_nonce: Option<String>,
    pub identity: Option<AuthenticatedIdentity>,
}

impl SessionRecord {
    pub fn new(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            created_at: now,
            expires_at: now + ttl,
            pending_nonce: None,
            identity: None,
        }
    }

    /// Transition to authenticated from a successful verification.
    ///
    /// Consumes the pending nonce and aligns session expiry with the
    /// message's expiration claim when one was stated.
    pub fn authenticate(&mut self, outcome: VerificationResult) {
        self.pending_nonce = None;
        if let Some(expires_at) = outcome.expiration_time {
            self.expires_at = expires_at;
        }
        self.identity = Some(AuthenticatedIdentity {
            address: outcome.address,
            claims: outcome.message,
        });
    }

    /// Discard the challenge after a failed verification.
    ///
    /// The client must request a fresh nonce to retry; a failed attempt
    /// never leaves a guessable challenge behind.
    pub fn discard_challenge(&mut self) {
        self.pending_nonce = None;
        self.identity = None;
    }

    /// Clear authentication state unconditionally (idempotent).
    pub fn disconnect(&mut self) {
        self.pending_nonce = None;
        self.identity = None;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Expiry is enforced lazily: an expired session reads as
    /// unauthenticated regardless of stored identity.
    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        self.identity.is_some() && !self.is_expired(now)
    }

    pub fn current_address(&self, now: DateTime<Utc>) -> Option<Address> {
        if self.is_expired(now) {
            return None;
        }
        self.identity.as_ref().map(|identity| identity.address)
    }
}
