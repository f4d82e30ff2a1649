use crate::provider::Diagnostics;
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Diagnostics(Diagnostics),
}

/// Input validation errors
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("input validation failed: {message}")]
    InputValidationFailed { message: String },
}

/// Configuration loading and resolution errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("invalid toml format: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("invalid provider configuration:\n{0}")]
    Invalid(Diagnostics),
}

/// Problems with the GitHub App identity itself, detected before any request
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("github app id must be positive, got {0}")]
    InvalidAppId(i64),

    #[error("github app installation id must be positive, got {0}")]
    InvalidInstallationId(i64),

    #[error("private key is not a valid RSA PEM (PKCS#1 or PKCS#8): {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Installation token exchange and authorization errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign github app jwt: {0}")]
    JwtSigningFailed(#[source] jsonwebtoken::errors::Error),

    #[error("token exchange for installation {installation_id} failed: {source}")]
    TokenExchangeFailed {
        installation_id: i64,
        #[source]
        source: reqwest::Error,
    },

    #[error("token exchange for installation {installation_id} rejected with status {status}: {message}")]
    TokenExchangeRejected {
        installation_id: i64,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("invalid token response for installation {installation_id}: {source}")]
    InvalidTokenResponse {
        installation_id: i64,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {path} was not authorized (status {status}): {message}")]
    Unauthorized {
        path: String,
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Environment public key lookup errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("environment {environment:?} not found in repository {repository_id}")]
    NotFound {
        repository_id: u64,
        environment: String,
    },

    #[error("github api returned status {status} for {path}: {message}")]
    Remote {
        path: String,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("invalid public key response for repository {repository_id}: {source}")]
    InvalidResponse {
        repository_id: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },
}

impl ClientError {
    /// Get a user-friendly error message for common failure modes
    pub fn user_friendly_message(&self) -> String {
        match self {
            ClientError::NotFound {
                repository_id,
                environment,
            } => format!(
                "not found - repository {repository_id} or environment {environment:?} does not exist, or the app cannot see it"
            ),
            ClientError::Auth(_) => {
                "unauthorized - check the github app id, installation id and private key".to_string()
            }
            ClientError::Remote { status, .. } => match status.as_u16() {
                403 => "forbidden - the app installation lacks the secrets or environments permission".to_string(),
                429 => "rate limited - too many requests, please try again later".to_string(),
                500..=599 => "github api is temporarily unavailable".to_string(),
                _ => format!("api error - github returned status {status}"),
            },
            ClientError::RequestFailed(e) => {
                if e.is_timeout() {
                    "request timeout - github did not respond in time".to_string()
                } else if e.is_connect() {
                    "connection failed - could not reach the github api".to_string()
                } else {
                    format!("network error - {e}")
                }
            }
            _ => self.to_string(),
        }
    }
}

/// Sealed box encryption errors
#[derive(Debug, Error)]
pub enum SealError {
    #[error("public key is not valid base64: {0}")]
    InvalidKeyEncoding(#[from] base64::DecodeError),

    #[error("invalid public key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("sealed box encryption failed")]
    Encryption,
}

impl SealError {
    /// Whether the error is attributable to the supplied recipient key
    pub fn is_invalid_key(&self) -> bool {
        matches!(
            self,
            SealError::InvalidKeyEncoding(_) | SealError::InvalidKeyLength(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_error_display() {
        let err = SealError::InvalidKeyLength(31);
        let msg = err.to_string();
        assert!(msg.contains("expected 32 bytes"));
        assert!(msg.contains("31"));
        assert!(err.is_invalid_key());
        assert!(!SealError::Encryption.is_invalid_key());
    }

    #[test]
    fn test_not_found_message_names_identifiers() {
        let err = ClientError::NotFound {
            repository_id: 42,
            environment: "production".to_string(),
        };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("production"));
        assert!(err.user_friendly_message().starts_with("not found"));
    }

    #[test]
    fn test_remote_error_friendly_messages() {
        let err = ClientError::Remote {
            path: "/repositories/1".to_string(),
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            message: "slow down".to_string(),
        };
        assert!(err.user_friendly_message().starts_with("rate limited"));

        let err = ClientError::Remote {
            path: "/repositories/1".to_string(),
            status: reqwest::StatusCode::IM_A_TEAPOT,
            message: String::new(),
        };
        assert!(err.user_friendly_message().contains("418"));
    }

    #[test]
    fn test_credential_error_display() {
        assert!(CredentialError::InvalidAppId(0).to_string().contains("positive"));
        assert!(CredentialError::InvalidInstallationId(-3)
            .to_string()
            .contains("-3"));
    }
}
