use crate::auth::github::{self, AccessTokenResponse, AppCredentials, InstallationToken};
use crate::auth::signing::AppJwtSigner;
use crate::error::{AuthError, ClientError, CredentialError};
use crate::security::SecureString;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Refresh installation tokens this long before GitHub says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// HTTP settings for the installation transport
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// HTTP transport authenticated as a GitHub App installation.
///
/// The installation token is minted lazily on first use and renewed shortly
/// before it expires. The token slot is guarded by an async mutex held across
/// the exchange, so concurrent callers that find the token stale wait for a
/// single refresh and then share its result.
pub struct InstallationTransport {
    client: reqwest::Client,
    api_base_url: String,
    installation_id: i64,
    signer: AppJwtSigner,
    token: Mutex<Option<InstallationToken>>,
}

impl InstallationTransport {
    /// Create a transport for the given app installation.
    ///
    /// No network traffic happens here; credentials are only checked locally.
    pub fn new(
        credentials: AppCredentials,
        options: TransportOptions,
    ) -> Result<Self, CredentialError> {
        if credentials.app_id() <= 0 {
            return Err(CredentialError::InvalidAppId(credentials.app_id()));
        }
        if credentials.installation_id() <= 0 {
            return Err(CredentialError::InvalidInstallationId(
                credentials.installation_id(),
            ));
        }

        let signer = AppJwtSigner::from_credentials(&credentials)?;
        let client = Self::create_optimized_client(options.request_timeout)?;

        Ok(Self {
            client,
            api_base_url: options.api_base_url.trim_end_matches('/').to_string(),
            installation_id: credentials.installation_id(),
            signer,
            token: Mutex::new(None),
        })
    }

    /// Create an HTTP client with connection pooling and GitHub's default headers
    fn create_optimized_client(timeout: Duration) -> Result<reqwest::Client, CredentialError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("githubcrypt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CredentialError::HttpClient)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn installation_id(&self) -> i64 {
        self.installation_id
    }

    /// Current installation token, refreshing it first if absent or about to expire
    pub async fn installation_token(&self) -> Result<SecureString, AuthError> {
        let mut slot = self.token.lock().await;
        let margin = chrono::Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS);

        if let Some(cached) = slot.as_ref() {
            if !cached.expires_within(margin, Utc::now()) {
                return Ok(cached.token().clone());
            }
            debug!(
                "Installation token for {} expires at {}, refreshing",
                self.installation_id,
                cached.expires_at()
            );
        }

        let fresh = self.exchange_token().await?;
        let token = fresh.token().clone();
        *slot = Some(fresh);

        Ok(token)
    }

    /// Trade a freshly signed app JWT for an installation access token
    async fn exchange_token(&self) -> Result<InstallationToken, AuthError> {
        let jwt = self.signer.sign()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_base_url, self.installation_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&jwt)
            .send()
            .await
            .map_err(|source| {
                warn!(
                    "Token exchange request for installation {} failed: {}",
                    self.installation_id, source
                );
                AuthError::TokenExchangeFailed {
                    installation_id: self.installation_id,
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = github::error_message(response).await;
            warn!(
                "GitHub rejected token exchange for installation {} with status {}",
                self.installation_id, status
            );
            return Err(AuthError::TokenExchangeRejected {
                installation_id: self.installation_id,
                status,
                message,
            });
        }

        let body: AccessTokenResponse =
            response
                .json()
                .await
                .map_err(|source| AuthError::InvalidTokenResponse {
                    installation_id: self.installation_id,
                    source,
                })?;

        info!(
            "Obtained installation token for installation {} (expires {})",
            self.installation_id, body.expires_at
        );

        Ok(InstallationToken::new(body.token, body.expires_at))
    }

    /// Send an authenticated GET to `path` (relative to the API base URL)
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, ClientError> {
        let token = self.installation_token().await?;
        let url = format!("{}{}", self.api_base_url, path);

        debug!("GET {}", path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await?;

        Ok(response)
    }
}

impl std::fmt::Debug for InstallationTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationTransport")
            .field("api_base_url", &self.api_base_url)
            .field("installation_id", &self.installation_id)
            .field("app_id", &self.signer.app_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{pkcs1_private_key_pem, pkcs8_private_key_pem, token_response_json};
    use chrono::Duration as ChronoDuration;
    use mockito::Matcher;
    use std::sync::Arc;

    const TOKEN_PATH: &str = "/app/installations/42/access_tokens";

    fn transport_for(url: &str) -> InstallationTransport {
        let credentials = AppCredentials::new(7, 42, pkcs1_private_key_pem());
        let options = TransportOptions {
            api_base_url: url.to_string(),
            request_timeout: Duration::from_secs(5),
        };
        InstallationTransport::new(credentials, options).unwrap()
    }

    #[tokio::test]
    async fn test_token_exchange_sends_app_jwt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_header(
                "authorization",
                Matcher::Regex(r"^Bearer [\w-]+\.[\w-]+\.[\w-]+$".to_string()),
            )
            .match_header("accept", "application/vnd.github+json")
            .match_header("x-github-api-version", GITHUB_API_VERSION)
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(token_response_json("ghs_first", ChronoDuration::hours(1)))
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let token = transport.installation_token().await.unwrap();

        assert_eq!(token.as_str(), "ghs_first");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(201)
            .with_body(token_response_json("ghs_cached", ChronoDuration::hours(1)))
            .expect(1)
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let first = transport.installation_token().await.unwrap();
        let second = transport.installation_token().await.unwrap();

        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(201)
            .with_body(token_response_json("ghs_shared", ChronoDuration::hours(1)))
            .expect(1)
            .create_async()
            .await;

        let transport = Arc::new(transport_for(&server.url()));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move {
                transport.installation_token().await
            }));
        }

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.as_str(), "ghs_shared");
        }
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_token_near_expiry_is_refreshed_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(201)
            .with_body(token_response_json("ghs_renewed", ChronoDuration::hours(1)))
            .expect(1)
            .create_async()
            .await;

        let transport = Arc::new(transport_for(&server.url()));
        *transport.token.lock().await = Some(InstallationToken::new(
            "ghs_stale",
            Utc::now() + ChronoDuration::seconds(30),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move {
                transport.installation_token().await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().as_str(), "ghs_renewed");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_exchange_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(401)
            .with_body(r#"{"message":"A JSON web token could not be decoded","documentation_url":"https://docs.github.com/rest"}"#)
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let err = transport.installation_token().await.unwrap_err();

        match err {
            AuthError::TokenExchangeRejected {
                installation_id,
                status,
                message,
            } => {
                assert_eq!(installation_id, 42);
                assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
                assert_eq!(message, "A JSON web token could not be decoded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_slot_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        assert!(transport.installation_token().await.is_err());
        assert!(transport.token.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_exchange_failure() {
        // Nothing listens on port 9 of the loopback interface
        let transport = transport_for("http://127.0.0.1:9");
        let err = transport.installation_token().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed { .. }));
    }

    #[tokio::test]
    async fn test_get_attaches_installation_token() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", TOKEN_PATH)
            .with_status(201)
            .with_body(token_response_json("ghs_ping", ChronoDuration::hours(1)))
            .create_async()
            .await;
        let ping = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer ghs_ping")
            .with_status(204)
            .create_async()
            .await;

        let transport = transport_for(&format!("{}/", server.url()));
        let response = transport.get("/ping").await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
        ping.assert_async().await;
    }

    #[test]
    fn test_rejects_non_positive_ids() {
        let credentials = AppCredentials::new(0, 42, pkcs8_private_key_pem());
        let result = InstallationTransport::new(credentials, TransportOptions::default());
        assert!(matches!(result, Err(CredentialError::InvalidAppId(0))));

        let credentials = AppCredentials::new(7, -1, pkcs8_private_key_pem());
        let result = InstallationTransport::new(credentials, TransportOptions::default());
        assert!(matches!(result, Err(CredentialError::InvalidInstallationId(-1))));
    }

    #[test]
    fn test_rejects_invalid_private_key() {
        let credentials = AppCredentials::new(7, 42, "-----BEGIN NOTHING-----".to_string());
        let result = InstallationTransport::new(credentials, TransportOptions::default());
        assert!(matches!(result, Err(CredentialError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_debug_omits_secrets() {
        let transport = transport_for("https://api.github.com");
        let debug = format!("{transport:?}");
        assert!(debug.contains("installation_id: 42"));
        assert!(!debug.contains("PRIVATE KEY"));
    }
}
