pub mod data_sources;
pub mod diagnostics;

pub use data_sources::{
    EncryptedSecretDataSource, EncryptedSecretRequest, EncryptedSecretResponse,
    EnvironmentPublicKeyDataSource, EnvironmentPublicKeyRequest, EnvironmentPublicKeyResponse,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};

use crate::auth::InstallationTransport;
use crate::client::ApiClient;
use crate::config::{EnvSource, ProviderConfig};
use crate::error::{ConfigError, CredentialError};
use std::sync::Arc;
use tracing::info;

/// Entry point of the provider: turns configuration into shared [`ProviderData`]
pub struct Provider;

impl Provider {
    pub const TYPE_NAME: &'static str = "githubcrypt";

    /// Type names of every data source this provider serves
    pub fn data_sources() -> [&'static str; 2] {
        [
            EnvironmentPublicKeyDataSource::TYPE_NAME,
            EncryptedSecretDataSource::TYPE_NAME,
        ]
    }

    /// Resolve configuration and build the authenticated API client.
    ///
    /// Performs no network calls; the first installation token is fetched lazily
    /// by the first data source read.
    pub fn configure(
        config: &ProviderConfig,
        env: &impl EnvSource,
    ) -> Result<ProviderData, Diagnostics> {
        let resolved = config.resolve(env).map_err(|e| match e {
            ConfigError::Invalid(diags) => diags,
            other => Diagnostics::from(Diagnostic::error(
                "Invalid Provider Configuration",
                other.to_string(),
            )),
        })?;

        let options = resolved.transport_options();
        let transport = InstallationTransport::new(resolved.credentials, options)
            .map_err(credential_diagnostic)?;

        info!(
            "Configured {} provider for owner {} against {}",
            Self::TYPE_NAME,
            resolved.owner,
            transport.api_base_url()
        );

        Ok(ProviderData {
            owner: resolved.owner,
            client: ApiClient::new(Arc::new(transport)),
        })
    }
}

fn credential_diagnostic(err: CredentialError) -> Diagnostics {
    let summary = "Unable to create GitHub App installation client";
    let detail = format!(
        "An unexpected error occurred when creating the GitHub App installation client: {err}"
    );

    let diagnostic = match err {
        CredentialError::InvalidAppId(_) => Diagnostic::attribute_error("app_id", summary, detail),
        CredentialError::InvalidInstallationId(_) => {
            Diagnostic::attribute_error("app_installation_id", summary, detail)
        }
        CredentialError::InvalidPrivateKey(_) => {
            Diagnostic::attribute_error("pem_file", summary, detail)
        }
        CredentialError::HttpClient(_) => Diagnostic::error(summary, detail),
    };

    diagnostic.into()
}

/// Configured provider state handed to each data source.
///
/// Cloning is cheap and shares the installation token cache.
#[derive(Clone)]
pub struct ProviderData {
    owner: String,
    client: ApiClient,
}

impl ProviderData {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}
