//! Integration tests for the walletgate API.
//!
//! Each test spins up a real server on an ephemeral port and drives it with
//! a cookie-keeping HTTP client, the way a wallet frontend would.

use alloy_core::primitives::{eip191_hash_message, Address};
use alloy_signer::{k256::ecdsa::SigningKey, utils::public_key_to_address};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use walletgate::{
    auth::middleware::AppState, config::Config, middleware::security_headers, routes,
    storage::session::SessionStore,
};

/// Generate a random ETH wallet for testing.
fn eth_wallet() -> (Address, SigningKey) {
    let signing_key = SigningKey::random(&mut rand::thread_rng());
    let address = public_key_to_address(signing_key.verifying_key());
    (address, signing_key)
}

/// Sign a message using EIP-191 personal_sign format.
fn sign_message(signing_key: &SigningKey, message: &str) -> String {
    let message_hash = eip191_hash_message(message.as_bytes());
    let (sig, recovery_id) = signing_key
        .sign_prehash_recoverable(&message_hash.0)
        .unwrap();

    let mut sig_bytes = [0u8; 65];
    sig_bytes[..64].copy_from_slice(&sig.to_bytes());
    sig_bytes[64] = recovery_id.to_byte();

    format!("0x{}", hex::encode(sig_bytes))
}

/// Build the EIP-4361 message a wallet frontend would prepare.
fn siwe_message(address: Address, nonce: &str, expiration: Option<DateTime<Utc>>) -> String {
    let mut message = format!(
        "localhost:3000 wants you to sign in with your Ethereum account:\n\
         {}\n\
         \n\
         Sign in with Ethereum to the app.\n\
         \n\
         URI: http://localhost:3000\n\
         Version: 1\n\
         Chain ID: 1\n\
         Nonce: {}\n\
         Issued At: {}",
        address.to_checksum(None),
        nonce,
        Utc::now().to_rfc3339()
    );
    if let Some(expiration) = expiration {
        message.push_str(&format!("\nExpiration Time: {}", expiration.to_rfc3339()));
    }
    message
}

/// Spin up a test server and return its base URL.
async fn spawn_test_server() -> String {
    let config = Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        session_ttl_secs: 3600,
        cookie_name: "walletgate.sid".to_string(),
        cookie_secure: false,
        allowed_origins: vec!["http://localhost:3000".to_string()],
    };

    let state = AppState {
        sessions: Arc::new(SessionStore::new(config.session_ttl_secs)),
        config: Arc::new(config),
    };

    let app = routes::api_router()
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

/// Helper: request a fresh nonce for the client's session.
async fn fetch_nonce(client: &reqwest::Client, base_url: &str) -> String {
    let resp = client
        .get(format!("{}/nonce", base_url))
        .send()
        .await
        .expect("Failed to fetch nonce");
    assert_eq!(resp.status(), 200);
    let nonce = resp.text().await.unwrap();
    assert!(!nonce.is_empty());
    nonce
}

/// Helper: submit a message + signature to /verify.
async fn post_verify(
    client: &reqwest::Client,
    base_url: &str,
    message: &str,
    signature: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/verify", base_url))
        .json(&serde_json::json!({ "message": message, "signature": signature }))
        .send()
        .await
        .expect("Failed to send verify request")
}

#[tokio::test]
async fn test_personal_information_requires_auth() {
    let base_url = spawn_test_server().await;
    let client = test_client();

    let resp = client
        .get(format!("{}/personal_information", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "You have to first sign in");
}

#[tokio::test]
async fn test_full_sign_in_flow_and_replay_rejection() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;

    let message = siwe_message(address, &nonce, Some(Utc::now() + Duration::hours(1)));
    let signature = sign_message(&key, &message);

    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status(), 200);

    // The session now reports the verified address
    let resp = client
        .get(format!("{}/personal_information", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert_eq!(
        body,
        format!(
            "You are authenticated and your address is: {}",
            address.to_checksum(None)
        )
    );

    // Replaying the identical {message, signature} must fail: the nonce
    // was consumed by the successful verification
    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid nonce.");
}

#[tokio::test]
async fn test_reissued_nonce_invalidates_previous() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();

    let first_nonce = fetch_nonce(&client, &base_url).await;
    let second_nonce = fetch_nonce(&client, &base_url).await;
    assert_ne!(first_nonce, second_nonce);

    // A message signed over the superseded nonce must be rejected
    let message = siwe_message(address, &first_nonce, None);
    let signature = sign_message(&key, &message);

    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid nonce.");
}

#[tokio::test]
async fn test_recovered_address_mismatch() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, _) = eth_wallet();
    let (_, other_key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;

    // Message claims one address but is signed by a different key
    let message = siwe_message(address, &nonce, None);
    let signature = sign_message(&other_key, &message);

    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid signature"));
}

#[tokio::test]
async fn test_expired_message_returns_440() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;

    // Correct nonce, valid signature, but the claim has already elapsed
    let message = siwe_message(address, &nonce, Some(Utc::now() - Duration::hours(1)));
    let signature = sign_message(&key, &message);

    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status().as_u16(), 440);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_malformed_verify_body() {
    let base_url = spawn_test_server().await;
    let client = test_client();

    // Missing fields
    let resp = client
        .post(format!("{}/verify", base_url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    // Not JSON at all
    let resp = client
        .post(format!("{}/verify", base_url))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    // Parseable body, but the message is not a sign-in message
    let resp = post_verify(&client, &base_url, "hello", "0x00").await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_failed_verify_discards_challenge() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();
    let (_, other_key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;

    // First attempt fails on signature
    let message = siwe_message(address, &nonce, None);
    let bad_signature = sign_message(&other_key, &message);
    let resp = post_verify(&client, &base_url, &message, &bad_signature).await;
    assert_eq!(resp.status(), 422);

    // The failed attempt consumed the challenge, so even a correct
    // signature over the same nonce is now rejected
    let good_signature = sign_message(&key, &message);
    let resp = post_verify(&client, &base_url, &message, &good_signature).await;
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid nonce.");
}

#[tokio::test]
async fn test_disconnect_clears_session() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;
    let message = siwe_message(address, &nonce, None);
    let signature = sign_message(&key, &message);
    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/disconnect", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("{}/personal_information", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Disconnect is idempotent
    let resp = client
        .post(format!("{}/disconnect", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn test_session_expires_with_message_claim() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;

    // Session expiry is overwritten by the verified expiration claim
    let message = siwe_message(address, &nonce, Some(Utc::now() + Duration::seconds(2)));
    let signature = sign_message(&key, &message);
    let resp = post_verify(&client, &base_url, &message, &signature).await;
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/personal_information", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;

    let resp = client
        .get(format!("{}/personal_information", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_concurrent_verify_consumes_nonce_once() {
    let base_url = spawn_test_server().await;
    let client = test_client();
    let (address, key) = eth_wallet();

    let nonce = fetch_nonce(&client, &base_url).await;
    let message = siwe_message(address, &nonce, Some(Utc::now() + Duration::hours(1)));
    let signature = sign_message(&key, &message);

    // Two simultaneous attempts with the same valid message: the per-session
    // lock must let exactly one consume the nonce
    let (first, second) = tokio::join!(
        post_verify(&client, &base_url, &message, &signature),
        post_verify(&client, &base_url, &message, &signature),
    );

    let statuses = [first.status().as_u16(), second.status().as_u16()];
    assert!(
        statuses.contains(&200) && statuses.contains(&422),
        "expected one success and one rejection, got {:?}",
        statuses
    );
}
