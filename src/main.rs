use clap::{Args, Parser};
use githubcrypt::{
    client::OutputFormat,
    config::{ConfigLoader, ProcessEnv, ProviderConfig},
    error::AppError,
    provider::{
        EncryptedSecretDataSource, EncryptedSecretRequest, EnvironmentPublicKeyDataSource,
        EnvironmentPublicKeyRequest, Provider,
    },
    security::SecureString,
};
use std::collections::BTreeMap;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
use serial_test::serial;

#[derive(Parser)]
#[command(name = "githubcrypt")]
#[command(about = "Fetch GitHub environment public keys and encrypt secrets for them")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub enum Cli {
    /// Fetch the public key of a repository environment
    PublicKey {
        /// Numeric ID of the repository
        #[arg(long)]
        repo_id: i64,
        /// Name of the environment within the repository
        #[arg(short, long)]
        environment: String,
        #[command(flatten)]
        provider: ProviderArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Encrypt a secret with a repository environment public key
    Encrypt {
        /// Base64 public key of the environment
        #[arg(short = 'k', long)]
        public_key: String,
        /// Secret value to encrypt
        #[arg(short, long, env = "GITHUB_SECRET_VALUE", hide_env_values = true)]
        secret: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Provider settings; unset flags fall back to the config file, then to GITHUB_* variables
#[derive(Args, Default)]
pub struct ProviderArgs {
    /// TOML file with provider settings
    #[arg(short, long)]
    config: Option<String>,
    /// GitHub organization or user owning the app installation
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    app_id: Option<String>,
    #[arg(long)]
    app_installation_id: Option<String>,
    /// PEM content of the GitHub App private key
    #[arg(long, allow_hyphen_values = true)]
    pem_file: Option<String>,
    /// GitHub API base URL, for GitHub Enterprise Server
    #[arg(long)]
    api_url: Option<String>,
    /// Request timeout in seconds
    #[arg(long)]
    request_timeout: Option<u64>,
}

impl ProviderArgs {
    /// Config file (if any) overlaid with command line flags
    fn into_config(self) -> Result<ProviderConfig, AppError> {
        let base = match &self.config {
            Some(path) => ConfigLoader::from_file(path)?,
            None => ProviderConfig::default(),
        };

        Ok(base.merge(ProviderConfig {
            owner: self.owner,
            app_id: self.app_id,
            app_installation_id: self.app_installation_id,
            pem_file: self.pem_file,
            api_base_url: self.api_url,
            request_timeout_secs: self.request_timeout,
        }))
    }
}

#[derive(Args)]
pub struct OutputArgs {
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    uppercase: bool,
}

impl OutputArgs {
    fn render(&self, values: &BTreeMap<String, String>) -> String {
        self.format
            .format_values(values, self.prefix.as_deref(), self.uppercase)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout only carries command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("githubcrypt=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli {
        Cli::PublicKey {
            repo_id,
            environment,
            provider,
            output,
        } => handle_public_key_command(repo_id, environment, provider, output).await,
        Cli::Encrypt {
            public_key,
            secret,
            output,
        } => handle_encrypt_command(public_key, SecureString::new(secret), output),
    };

    match result {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Handle the public-key command
async fn handle_public_key_command(
    repo_id: i64,
    environment: String,
    provider: ProviderArgs,
    output: OutputArgs,
) -> Result<String, AppError> {
    let config = provider.into_config()?;
    let data = Provider::configure(&config, &ProcessEnv).map_err(AppError::Diagnostics)?;

    info!("Fetching public key for repository {}", repo_id);
    let response = EnvironmentPublicKeyDataSource::new(&data)
        .read(&EnvironmentPublicKeyRequest {
            repo_id,
            environment,
        })
        .await
        .map_err(AppError::Diagnostics)?;

    let mut values = BTreeMap::new();
    values.insert("repo_id".to_string(), response.repo_id.to_string());
    values.insert("environment".to_string(), response.environment);
    values.insert("key_id".to_string(), response.key_id);
    values.insert("public_key".to_string(), response.public_key);

    Ok(output.render(&values))
}

/// Handle the encrypt command
fn handle_encrypt_command(
    public_key: String,
    secret: SecureString,
    output: OutputArgs,
) -> Result<String, AppError> {
    let response = EncryptedSecretDataSource::new()
        .read(&EncryptedSecretRequest {
            public_key_base64: public_key,
            secret,
        })
        .map_err(AppError::Diagnostics)?;

    let mut values = BTreeMap::new();
    values.insert(
        "secret_encrypted_base64".to_string(),
        response.secret_encrypted_base64,
    );

    Ok(output.render(&values))
}

fn report_error(error: &AppError) {
    match error {
        AppError::Diagnostics(diags) => {
            for diagnostic in diags.iter() {
                eprintln!("{diagnostic}");
            }
        }
        AppError::Config(e) => eprintln!("Error: {e}"),
    }
}
