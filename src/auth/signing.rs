use crate::auth::github::{AppClaims, AppCredentials};
use crate::error::{AuthError, CredentialError};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tracing::debug;

/// Signs GitHub App JWTs with the app's RSA private key
pub struct AppJwtSigner {
    app_id: i64,
    encoding_key: EncodingKey,
}

impl AppJwtSigner {
    /// Build a signer from app credentials.
    ///
    /// Accepts PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) PEM. The key is
    /// exercised once here so a PEM with valid armor but a broken body is rejected
    /// up front instead of on the first API call.
    pub fn from_credentials(credentials: &AppCredentials) -> Result<Self, CredentialError> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key_pem())
            .map_err(CredentialError::InvalidPrivateKey)?;

        let signer = Self {
            app_id: credentials.app_id(),
            encoding_key,
        };

        signer
            .encode_at(Utc::now())
            .map_err(CredentialError::InvalidPrivateKey)?;

        debug!("Loaded signing key for GitHub App {}", signer.app_id);
        Ok(signer)
    }

    pub fn app_id(&self) -> i64 {
        self.app_id
    }

    /// Sign a fresh app JWT valid for the next nine minutes
    pub fn sign(&self) -> Result<String, AuthError> {
        self.encode_at(Utc::now())
            .map_err(AuthError::JwtSigningFailed)
    }

    fn encode_at(&self, now: DateTime<Utc>) -> jsonwebtoken::errors::Result<String> {
        let claims = AppClaims::new(self.app_id, now);
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
    }
}
