//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BFGUARD_*)
//! 2. TOML config file (if BFGUARD_CONFIG_FILE set)
//! 3. Built-in defaults

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BFGUARD_*)
/// 2. TOML config file (if BFGUARD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the script-readable cookie carrying the session fingerprint.
    ///
    /// Set via BFGUARD_SESSION_COOKIE_NAME environment variable.
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Name of the cookie recording that scripting was available at login.
    ///
    /// Set via BFGUARD_SCRIPTING_COOKIE_NAME environment variable.
    #[serde(default = "default_scripting_cookie_name")]
    pub scripting_cookie_name: String,

    /// Cross-tab broadcast topic published from the login surface.
    ///
    /// Set via BFGUARD_LOGIN_CHANNEL_NAME environment variable. Must be
    /// shared verbatim between the login surface and every subscriber.
    #[serde(default = "default_login_channel_name")]
    pub login_channel_name: String,

    /// Cookie path for the deployment.
    ///
    /// Set via BFGUARD_COOKIE_PATH environment variable.
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Site-wide cookie path, when it differs from `cookie_path`.
    ///
    /// Cookies are set on both paths so that the fingerprint is visible
    /// on the front end and the admin surface alike.
    #[serde(default = "default_cookie_path")]
    pub site_cookie_path: String,

    /// URL the login form posts to, used by the opt-in recorder to decide
    /// whether a submitted form is actually the login form.
    ///
    /// Set via BFGUARD_LOGIN_POST_URL environment variable.
    #[serde(default = "default_login_post_url")]
    pub login_post_url: String,

    /// Whether fingerprint cookies carry the Secure attribute.
    ///
    /// `None` defers to the scheme of `login_post_url`. The source
    /// deployments were inconsistent about this; it stays configurable.
    #[serde(default)]
    pub secure_cookies: Option<bool>,

    /// Fingerprint cookie lifetime in days.
    ///
    /// Set via BFGUARD_TOKEN_TTL_DAYS environment variable.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: u32,

    /// Whether the client diagnostics surface is enabled.
    ///
    /// Set via BFGUARD_DEBUG environment variable.
    #[serde(default)]
    pub debug: bool,
}

fn default_session_cookie_name() -> String {
    "bfguard_session".into()
}

fn default_scripting_cookie_name() -> String {
    "bfguard_js_enabled".into()
}

fn default_login_channel_name() -> String {
    "bfguard_login".into()
}

fn default_cookie_path() -> String {
    "/".into()
}

fn default_login_post_url() -> String {
    "https://localhost/login".into()
}

fn default_token_ttl_days() -> u32 {
    14
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: default_session_cookie_name(),
            scripting_cookie_name: default_scripting_cookie_name(),
            login_channel_name: default_login_channel_name(),
            cookie_path: default_cookie_path(),
            site_cookie_path: default_cookie_path(),
            login_post_url: default_login_post_url(),
            secure_cookies: None,
            token_ttl_days: default_token_ttl_days(),
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BFGUARD_`
    /// 2. TOML file from `BFGUARD_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BFGUARD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BFGUARD_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Resolve the effective Secure attribute for issued cookies.
    ///
    /// When not configured explicitly, cookies are secure exactly when
    /// the login surface itself is served over HTTPS.
    pub fn effective_secure_cookies(&self) -> bool {
        self.secure_cookies
            .unwrap_or_else(|| self.login_post_url.starts_with("https:"))
    }
}
