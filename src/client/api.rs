use crate::auth::{github, InstallationTransport};
use crate::error::{AuthError, ClientError};
use crate::security::InputValidator;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Public key of a repository environment, used to seal secrets for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentKey {
    pub repository_id: u64,
    pub environment_name: String,
    pub key_id: String,
    pub key_base64: String,
}

/// Body of the environment public key endpoint
#[derive(Deserialize)]
struct PublicKeyResponse {
    key_id: String,
    key: String,
}

/// GitHub API client authenticated as an app installation.
///
/// Cheap to clone; clones share the underlying transport and its token cache.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<InstallationTransport>,
    validator: Arc<InputValidator>,
}

impl ApiClient {
    pub fn new(transport: Arc<InstallationTransport>) -> Self {
        Self {
            transport,
            validator: Arc::new(InputValidator::default()),
        }
    }

    pub fn transport(&self) -> &InstallationTransport {
        &self.transport
    }

    /// Fetch the current public key of an environment.
    ///
    /// # Arguments
    /// * `repository_id` - Numeric ID of the repository
    /// * `environment_name` - Name of the environment within that repository
    ///
    /// # Returns
    /// * `Ok(EnvironmentKey)` - Key material and key ID, never cached
    /// * `Err(ClientError::NotFound)` - Repository or environment does not exist
    /// * `Err(ClientError::Auth)` - The installation could not be authorized
    /// * `Err(ClientError::Remote)` - Any other non-success response
    pub async fn fetch_public_key(
        &self,
        repository_id: u64,
        environment_name: &str,
    ) -> Result<EnvironmentKey, ClientError> {
        if repository_id == 0 {
            return Err(ClientError::InvalidInput {
                field: "repository_id".to_string(),
                message: "repository id must be positive".to_string(),
            });
        }

        self.validator
            .validate_environment_name(environment_name)
            .map_err(|e| ClientError::InvalidInput {
                field: "environment".to_string(),
                message: e.to_string(),
            })?;

        let path = format!(
            "/repositories/{}/environments/{}/secrets/public-key",
            repository_id,
            urlencoding::encode(environment_name)
        );

        let response = self.transport.get(&path).await?;
        let status = response.status();

        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                warn!(
                    "Environment {} not found in repository {}",
                    self.validator.sanitize_log_input(environment_name),
                    repository_id
                );
                return Err(ClientError::NotFound {
                    repository_id,
                    environment: environment_name.to_string(),
                });
            }
            StatusCode::UNAUTHORIZED => {
                let message = github::error_message(response).await;
                warn!("Installation token was not accepted for {}", path);
                return Err(AuthError::Unauthorized {
                    path,
                    status,
                    message,
                }
                .into());
            }
            _ => {
                let message = github::error_message(response).await;
                warn!("GitHub returned status {} for {}", status, path);
                return Err(ClientError::Remote {
                    path,
                    status,
                    message,
                });
            }
        }

        let body: PublicKeyResponse =
            response
                .json()
                .await
                .map_err(|source| ClientError::InvalidResponse {
                    repository_id,
                    source,
                })?;

        info!(
            "Fetched public key {} for environment {} of repository {}",
            body.key_id,
            self.validator.sanitize_log_input(environment_name),
            repository_id
        );

        Ok(EnvironmentKey {
            repository_id,
            environment_name: environment_name.to_string(),
            key_id: body.key_id,
            key_base64: body.key,
        })
    }
}
