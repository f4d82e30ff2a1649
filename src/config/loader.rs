use crate::config::types::ProviderConfig;
use crate::error::ConfigError;
use std::fs;
use tracing::{info, warn};

/// Provider files hold a private key; anything bigger than this is not one of ours.
const MAX_CONFIG_SIZE: usize = 1024 * 1024;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load provider configuration from a TOML file with security validation
    pub fn from_file(path: &str) -> Result<ProviderConfig, ConfigError> {
        Self::validate_config_path(path)?;

        let content = fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file {}: {}", path, e);
            ConfigError::FileReadError(e)
        })?;

        Self::validate_config_content(&content)?;
        Self::warn_if_world_readable(path);

        let config = Self::from_toml_str(&content).map_err(|e| {
            warn!("Failed to parse TOML in {}: {}", path, e);
            e
        })?;

        info!("Provider configuration loaded from {}", path);
        Ok(config)
    }

    /// Parse provider configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<ProviderConfig, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration file path for security
    fn validate_config_path(path: &str) -> Result<(), ConfigError> {
        if path.contains("../") || path.contains("..\\") {
            warn!("Configuration path contains path traversal: {}", path);
            return Err(ConfigError::ValidationError {
                message: "configuration path contains path traversal sequences".to_string(),
            });
        }

        if path.chars().any(|c| c.is_control()) {
            warn!("Configuration path contains invalid characters");
            return Err(ConfigError::ValidationError {
                message: "configuration path contains invalid characters".to_string(),
            });
        }

        if path.len() > 1024 {
            warn!("Configuration path too long: {} characters", path.len());
            return Err(ConfigError::ValidationError {
                message: format!("configuration path too long: {} characters", path.len()),
            });
        }

        let suspicious_patterns = ["/proc/", "/sys/", "/dev/", "\\\\"];

        for pattern in &suspicious_patterns {
            if path.to_lowercase().contains(pattern) {
                warn!("Configuration path contains suspicious pattern: {}", pattern);
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "configuration path contains suspicious pattern: {}",
                        pattern
                    ),
                });
            }
        }

        Ok(())
    }

    /// Validate configuration file content before parsing
    fn validate_config_content(content: &str) -> Result<(), ConfigError> {
        if content.len() > MAX_CONFIG_SIZE {
            warn!("Configuration file too large: {} bytes", content.len());
            return Err(ConfigError::ValidationError {
                message: format!("configuration file too large: {} bytes", content.len()),
            });
        }

        if content.contains('\0') {
            warn!("Configuration file contains binary data");
            return Err(ConfigError::ValidationError {
                message: "configuration file appears to contain binary data".to_string(),
            });
        }

        Ok(())
    }

    #[cfg(unix)]
    fn warn_if_world_readable(path: &str) {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = fs::metadata(path) {
            if metadata.permissions().mode() & 0o077 != 0 {
                warn!(
                    "Configuration file {} is accessible by other users and may contain a private key",
                    path
                );
            }
        }
    }

    #[cfg(not(unix))]
    fn warn_if_world_readable(_path: &str) {}
}
