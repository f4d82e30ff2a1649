use crate::error::SecurityError;
use regex::Regex;
use std::collections::HashSet;

/// GitHub logins are at most 39 characters.
const MAX_OWNER_LENGTH: usize = 39;
/// GitHub rejects environment names longer than 255 characters.
const MAX_ENVIRONMENT_LENGTH: usize = 255;

/// Input validator for values that end up in GitHub API paths or settings
pub struct InputValidator {
    owner_pattern: Regex,
    forbidden_patterns: Vec<Regex>,
    allowed_schemes: HashSet<String>,
}

impl Default for InputValidator {
    fn default() -> Self {
        // Alphanumerics separated by single hyphens, no leading or trailing hyphen.
        let owner_pattern = Regex::new(r"^[A-Za-z0-9](?:-?[A-Za-z0-9])*$")
            .expect("owner pattern is a valid regex");

        let forbidden_patterns = vec![
            // Path traversal patterns
            Regex::new(r"(\.\./|\.\.\\)").expect("traversal pattern is a valid regex"),
            // XSS patterns
            Regex::new(r"(?i)(<script|javascript:)").expect("xss pattern is a valid regex"),
        ];

        let mut allowed_schemes = HashSet::new();
        allowed_schemes.insert("https".to_string());

        Self {
            owner_pattern,
            forbidden_patterns,
            allowed_schemes,
        }
    }
}

impl InputValidator {
    /// Create a validator; `allow_insecure` additionally accepts plain http API
    /// endpoints (local mocks, GitHub Enterprise behind a proxy).
    pub fn new(allow_insecure: bool) -> Self {
        let mut validator = Self::default();

        if allow_insecure {
            validator.allowed_schemes.insert("http".to_string());
        }

        validator
    }

    /// Validate a GitHub organization or user login
    pub fn validate_owner(&self, owner: &str) -> Result<(), SecurityError> {
        if owner.is_empty() {
            return Err(SecurityError::InputValidationFailed {
                message: "owner cannot be empty".to_string(),
            });
        }

        if owner.len() > MAX_OWNER_LENGTH {
            return Err(SecurityError::InputValidationFailed {
                message: format!("owner too long: {} characters", owner.len()),
            });
        }

        if !self.owner_pattern.is_match(owner) {
            return Err(SecurityError::InputValidationFailed {
                message: format!("invalid characters in owner: {owner}"),
            });
        }

        Ok(())
    }

    /// Validate a repository environment name
    pub fn validate_environment_name(&self, environment: &str) -> Result<(), SecurityError> {
        if environment.trim().is_empty() {
            return Err(SecurityError::InputValidationFailed {
                message: "environment name cannot be empty".to_string(),
            });
        }

        if environment.chars().count() > MAX_ENVIRONMENT_LENGTH {
            return Err(SecurityError::InputValidationFailed {
                message: format!(
                    "environment name too long: {} characters",
                    environment.chars().count()
                ),
            });
        }

        if environment.chars().any(|c| c.is_control()) {
            return Err(SecurityError::InputValidationFailed {
                message: "environment name contains control characters".to_string(),
            });
        }

        for pattern in &self.forbidden_patterns {
            if pattern.is_match(environment) {
                return Err(SecurityError::InputValidationFailed {
                    message: "environment name contains forbidden patterns".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validate the GitHub API base URL
    pub fn validate_api_base_url(&self, url: &str) -> Result<(), SecurityError> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            SecurityError::InputValidationFailed {
                message: format!("api url must include a scheme: {url}"),
            }
        })?;

        if !self.allowed_schemes.contains(scheme) {
            return Err(SecurityError::InputValidationFailed {
                message: format!("scheme '{scheme}' is not allowed"),
            });
        }

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(SecurityError::InputValidationFailed {
                message: "api url has no host".to_string(),
            });
        }

        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(SecurityError::InputValidationFailed {
                message: "api url contains whitespace or control characters".to_string(),
            });
        }

        Ok(())
    }

    /// Strip control characters and cap the length of values echoed into logs
    pub fn sanitize_log_input(&self, input: &str) -> String {
        input
            .chars()
            .filter(|c| !c.is_control())
            .take(256)
            .collect()
    }
}
