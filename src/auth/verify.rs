//! EIP-191 signature verification for sign-in messages.
//!
//! `verify_message` is a pure function over the submitted message, the
//! signature, and the session's pending nonce: it never touches session
//! state, so callers decide what a failure does to the session. The checks
//! run in a fixed order (structure, signature, expiration, nonce) and the
//! first failure wins.

use crate::auth::message::{ParseError, SignInMessage};
use alloy_core::primitives::{Address, Signature};
use chrono::{DateTime, Utc};

/// Outcome of a successful verification; feeds the session transition.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub address: Address,
    pub expiration_time: Option<DateTime<Utc>>,
    pub message: SignInMessage,
}

/// Distinguishable verification failures.
///
/// Every variant is a verdict about the submitted message; all of them
/// invalidate the pending challenge.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("unparseable sign-in message: {0}")]
    Malformed(#[from] ParseError),

    #[error("{0}")]
    InvalidSignature(String),

    #[error("message nonce does not match the pending challenge")]
    NonceMismatch,

    #[error("message expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Recover the EIP-191 signer of `payload` from a hex-encoded 65-byte
/// `personal_sign` signature.
///
/// This is the only function that touches the signature scheme; swapping
/// schemes means swapping this recovery step.
pub fn recover_signer(payload: &str, signature: &str) -> Result<Address, VerifyError> {
    let signature: Signature = signature
        .trim()
        .parse()
        .map_err(|e| VerifyError::InvalidSignature(format!("signature does not parse: {}", e)))?;

    signature
        .recover_address_from_msg(payload.as_bytes())
        .map_err(|e| VerifyError::InvalidSignature(format!("signature recovery failed: {}", e)))
}

/// Verify a raw sign-in message and signature against the session's pending
/// nonce.
///
/// The signature is checked over the canonical re-serialization of the
/// parsed message, the exact bytes the wallet was instructed to sign.
/// `pending_nonce` must be the value held *before* any session mutation for
/// this attempt; comparing against it is the anti-replay guard.
pub fn verify_message(
    raw: &str,
    signature: &str,
    pending_nonce: Option<&str>,
    now: DateTime<Utc>,
) -> Result<VerificationResult, VerifyError> {
    let message: SignInMessage = raw.parse()?;

    let canonical = message.to_string();
    let recovered = recover_signer(&canonical, signature)?;
    if recovered != message.address {
        return Err(VerifyError::InvalidSignature(format!(
            "recovered address {} does not match message address {}",
            recovered, message.address
        )));
    }

    if let Some(expiration) = &message.expiration_time {
        if expiration.instant() < now {
            return Err(VerifyError::Expired(expiration.instant()));
        }
    }

    if pending_nonce != Some(message.nonce.as_str()) {
        return Err(VerifyError::NonceMismatch);
    }

    Ok(VerificationResult {
        address: message.address,
        expiration_time: message.expiration_time.as_ref().map(|t| t.instant()),
        message,
    })
}
