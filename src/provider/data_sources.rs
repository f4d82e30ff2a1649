use crate::client::ApiClient;
use crate::error::{ClientError, SealError};
use crate::provider::diagnostics::{Diagnostic, Diagnostics};
use crate::provider::ProviderData;
use crate::secrets::SealRequest;
use crate::security::SecureString;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Read the public key of a repository environment
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentPublicKeyRequest {
    pub repo_id: i64,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentPublicKeyResponse {
    pub repo_id: i64,
    pub environment: String,
    pub key_id: String,
    pub public_key: String,
}

/// Data source resolving an environment's current public key
pub struct EnvironmentPublicKeyDataSource {
    client: ApiClient,
}

impl EnvironmentPublicKeyDataSource {
    pub const TYPE_NAME: &'static str = "githubcrypt_environment_public_key";

    pub fn new(data: &ProviderData) -> Self {
        Self {
            client: data.client().clone(),
        }
    }

    /// Fetch the key from GitHub; recomputed on every read
    pub async fn read(
        &self,
        request: &EnvironmentPublicKeyRequest,
    ) -> Result<EnvironmentPublicKeyResponse, Diagnostics> {
        let repository_id = u64::try_from(request.repo_id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                Diagnostic::attribute_error(
                    "repo_id",
                    "Invalid Repository ID",
                    format!(
                        "The repository ID must be a positive integer, got {}.",
                        request.repo_id
                    ),
                )
            })?;

        let key = self
            .client
            .fetch_public_key(repository_id, &request.environment)
            .await
            .map_err(|e| fetch_diagnostic(request.repo_id, e))?;

        Ok(EnvironmentPublicKeyResponse {
            repo_id: request.repo_id,
            environment: request.environment.clone(),
            key_id: key.key_id,
            public_key: key.key_base64,
        })
    }
}

fn fetch_diagnostic(repo_id: i64, err: ClientError) -> Diagnostics {
    let summary = format!("Failed to read repository ({repo_id}) public key");

    let diagnostic = match &err {
        ClientError::InvalidInput { field, message } => {
            let attribute = match field.as_str() {
                "repository_id" => "repo_id",
                other => other,
            };
            Diagnostic::attribute_error(attribute, summary, message.clone())
        }
        ClientError::NotFound { .. } => Diagnostic::error(
            summary,
            format!(
                "The repository or environment was not found, or the GitHub App installation cannot access it: {err}"
            ),
        ),
        _ => Diagnostic::error(
            summary,
            format!(
                "An unexpected error occurred while reading the repository ({repo_id}) public key. \
                 GitHub API client error: {}",
                err.user_friendly_message()
            ),
        ),
    };

    diagnostic.into()
}

/// Encrypt a secret for a repository environment
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedSecretRequest {
    pub public_key_base64: String,
    #[serde(deserialize_with = "deserialize_secure")]
    pub secret: SecureString,
}

fn deserialize_secure<'de, D>(deserializer: D) -> Result<SecureString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecureString::new)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedSecretResponse {
    pub public_key_base64: String,
    pub secret_encrypted_base64: String,
}

/// Data source sealing a secret against an environment public key.
///
/// Pure: needs no provider data and never talks to GitHub.
#[derive(Debug, Default)]
pub struct EncryptedSecretDataSource;

impl EncryptedSecretDataSource {
    pub const TYPE_NAME: &'static str = "githubcrypt_encrypted_environment_secret";

    pub fn new() -> Self {
        Self
    }

    pub fn read(
        &self,
        request: &EncryptedSecretRequest,
    ) -> Result<EncryptedSecretResponse, Diagnostics> {
        let sealed = SealRequest::new(request.public_key_base64.clone(), request.secret.clone())
            .seal()
            .map_err(seal_diagnostic)?;

        debug!("Encrypted secret for {}", Self::TYPE_NAME);

        Ok(EncryptedSecretResponse {
            public_key_base64: request.public_key_base64.clone(),
            secret_encrypted_base64: sealed.into_inner(),
        })
    }
}

fn seal_diagnostic(err: SealError) -> Diagnostics {
    let summary = "Failed to encrypt the secret with the repository environment public key";

    let diagnostic = if err.is_invalid_key() {
        Diagnostic::attribute_error(
            "public_key_base64",
            summary,
            format!("Failed to decode the repository environment public key: {err}"),
        )
    } else {
        Diagnostic::error(summary, format!("Failed to encrypt the secret: {err}"))
    };

    diagnostic.into()
}
