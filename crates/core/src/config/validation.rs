//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn validate_cookie_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
    }
    if name.contains([';', '=', ' ']) {
        return Err(ConfigError::Invalid {
            field: field.into(),
            reason: "must not contain ';', '=' or whitespace".into(),
        });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - either cookie name is empty or contains separator characters
    /// - the login channel name is empty
    /// - a cookie path does not start with `/`
    /// - `token_ttl_days` is 0 or exceeds one year
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cookie_name("session_cookie_name", &self.session_cookie_name)?;
        validate_cookie_name("scripting_cookie_name", &self.scripting_cookie_name)?;

        if self.session_cookie_name == self.scripting_cookie_name {
            return Err(ConfigError::Invalid {
                field: "scripting_cookie_name".into(),
                reason: "must differ from session_cookie_name".into(),
            });
        }

        if self.login_channel_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "login_channel_name".into(),
                reason: "must not be empty".into(),
            });
        }

        for (field, path) in [("cookie_path", &self.cookie_path), ("site_cookie_path", &self.site_cookie_path)] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must start with '/'".into() });
            }
        }

        if self.token_ttl_days == 0 {
            return Err(ConfigError::Invalid {
                field: "token_ttl_days".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.token_ttl_days > 365 {
            return Err(ConfigError::Invalid {
                field: "token_ttl_days".into(),
                reason: "must not exceed 365 days".into(),
            });
        }

        if self.secure_cookies == Some(false) && self.login_post_url.starts_with("https:") {
            tracing::warn!(
                login_post_url = %self.login_post_url,
                "secure_cookies disabled on an HTTPS deployment; \
                 the fingerprint cookie will be sent over plaintext transports"
            );
        }

        Ok(())
    }
}
