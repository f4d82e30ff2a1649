#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, SecondsFormat, Utc};
use crypto_box::{aead::OsRng, SecretKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::json;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Shared 2048-bit app key; generation is slow so every test in a binary reuses it
pub fn test_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut OsRng, 2048)
            .expect("Failed to generate test RSA key")
    })
}

/// App private key in PKCS#1 (`RSA PRIVATE KEY`) form, as GitHub hands it out
pub fn pkcs1_private_key_pem() -> String {
    test_private_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("Failed to encode PKCS#1 PEM")
        .to_string()
}

/// App private key in PKCS#8 (`PRIVATE KEY`) form
pub fn pkcs8_private_key_pem() -> String {
    test_private_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("Failed to encode PKCS#8 PEM")
        .to_string()
}

/// Public half of the app key, for verifying signed JWTs
pub fn public_key_pem() -> String {
    RsaPublicKey::from(test_private_key())
        .to_public_key_pem(LineEnding::LF)
        .expect("Failed to encode public key PEM")
}

/// Create a mock installation token response JSON
pub fn token_response_json(token: &str, expires_in: Duration) -> String {
    json!({
        "token": token,
        "expires_at": (Utc::now() + expires_in).to_rfc3339_opts(SecondsFormat::Secs, true),
        "permissions": { "secrets": "read", "environments": "read" },
        "repository_selection": "selected"
    })
    .to_string()
}

/// Create a mock environment public key response JSON
pub fn public_key_response_json(key_id: &str, key: &str) -> String {
    json!({ "key_id": key_id, "key": key }).to_string()
}

/// Generate a recipient key pair, returning the secret key and the base64 public key
pub fn recipient_key_pair() -> (SecretKey, String) {
    let secret_key = SecretKey::generate(&mut OsRng);
    let public_key = STANDARD.encode(secret_key.public_key().as_bytes());
    (secret_key, public_key)
}

/// Provider environment variables pointing at a mock API
pub fn provider_env(api_url: &str) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("GITHUB_OWNER".to_string(), "octo-org".to_string());
    env.insert("GITHUB_APP_ID".to_string(), "12345".to_string());
    env.insert("GITHUB_APP_INSTALLATION_ID".to_string(), "67890".to_string());
    env.insert("GITHUB_PEM_FILE".to_string(), pkcs1_private_key_pem());
    env.insert("GITHUB_API_URL".to_string(), api_url.to_string());
    env
}
