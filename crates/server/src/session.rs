//! Fingerprint rotation over the authentication lifecycle.
//!
//! The fingerprint cookie changes exactly when the effective identity
//! changes: a fresh token on successful login, cleared on logout. A
//! token is only issued when the login proved scripting capability and
//! carried the remember-me opt-in; without a token the header relaxation
//! in [`crate::headers`] never fires, so sessions that could not run the
//! restore check keep `no-store` end to end.

use chrono::{DateTime, Duration, Utc};

use bfguard_client::GuardData;
use bfguard_client::env::SharedCookieJar;
use bfguard_core::{AppConfig, CookieAttributes, Error, SessionToken, clear_cookie_header, set_cookie_header};

/// One authenticated session as the server tracks it.
///
/// The token lives in the server-side session record as well as the
/// cookie, so a deleted cookie can be re-issued mid-session and the
/// token survives identity switches that restore an earlier session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: u64,
    pub remember_me: bool,
    pub bfcache_token: Option<SessionToken>,
}

/// Issues, re-issues, and clears fingerprint cookies.
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: AppConfig,
}

impl SessionManager {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Complete a successful authentication.
    ///
    /// A bfcache token is attached exactly when the user opted in via
    /// remember-me AND the scripting-capability cookie is present in the
    /// request (fail closed on either missing). The token cookie is set
    /// on both configured paths.
    ///
    /// # Errors
    ///
    /// Returns an error only when the configured cookie name cannot form
    /// a valid header, which validation rules out up front.
    pub fn login(
        &self, jar: &SharedCookieJar, user_id: u64, remember_me: bool, now: DateTime<Utc>,
    ) -> Result<AuthSession, Error> {
        let scripting_proven = jar.get(&self.config.scripting_cookie_name).is_some();
        let token = if remember_me && scripting_proven {
            Some(SessionToken::generate())
        } else {
            tracing::debug!(user_id, remember_me, scripting_proven, "bfcache token withheld");
            None
        };

        if let Some(token) = &token {
            for header in self.token_cookie_headers(token, now)? {
                jar.apply_set_cookie(&header);
            }
            tracing::info!(user_id, "bfcache token issued");
        }

        Ok(AuthSession { user_id, remember_me, bfcache_token: token })
    }

    /// Clear the fingerprint cookie on logout, on both paths.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::login`].
    pub fn logout(&self, jar: &SharedCookieJar) -> Result<Vec<String>, Error> {
        let mut headers = vec![clear_cookie_header(&self.config.session_cookie_name, &self.config.cookie_path)?];
        if self.config.site_cookie_path != self.config.cookie_path {
            headers.push(clear_cookie_header(
                &self.config.session_cookie_name,
                &self.config.site_cookie_path,
            )?);
        }
        for header in &headers {
            jar.apply_set_cookie(header);
        }
        tracing::info!("bfcache token cleared");
        Ok(headers)
    }

    /// Re-issue the token cookie from the session record when it has
    /// gone missing mid-session, so the client check keeps working.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::login`].
    pub fn reissue_cookie_if_missing(
        &self, session: &AuthSession, jar: &SharedCookieJar, now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let Some(token) = &session.bfcache_token else {
            return Ok(false);
        };
        if jar.get(&self.config.session_cookie_name).is_some() {
            return Ok(false);
        }
        for header in self.token_cookie_headers(token, now)? {
            jar.apply_set_cookie(&header);
        }
        tracing::debug!(user_id = session.user_id, "bfcache token cookie re-issued");
        Ok(true)
    }

    /// The initialization payload served into every protected page.
    pub fn guard_payload(&self) -> GuardData {
        GuardData {
            cookie_name: self.config.session_cookie_name.clone(),
            channel_name: self.config.login_channel_name.clone(),
            debug: self.config.debug,
        }
    }

    fn token_cookie_headers(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Vec<String>, Error> {
        let expires = now + Duration::days(i64::from(self.config.token_ttl_days));
        let secure = self.config.effective_secure_cookies();

        let mut paths = vec![self.config.cookie_path.clone()];
        if self.config.site_cookie_path != self.config.cookie_path {
            paths.push(self.config.site_cookie_path.clone());
        }

        paths
            .into_iter()
            .map(|path| {
                let attributes = CookieAttributes { path, expires: Some(expires), secure };
                set_cookie_header(&self.config.session_cookie_name, token.as_str(), &attributes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(AppConfig::default())
    }

    fn jar_with_scripting_proof() -> SharedCookieJar {
        let jar = SharedCookieJar::new();
        jar.apply_set_cookie("bfguard_js_enabled=1");
        jar
    }

    #[test]
    fn test_login_issues_token_when_opted_in() {
        let jar = jar_with_scripting_proof();
        let session = manager().login(&jar, 1, true, Utc::now()).unwrap();

        let token = session.bfcache_token.expect("token issued");
        assert_eq!(jar.get("bfguard_session"), Some(token.as_str().to_string()));
    }

    #[test]
    fn test_login_without_remember_me_withholds_token() {
        let jar = jar_with_scripting_proof();
        let session = manager().login(&jar, 1, false, Utc::now()).unwrap();

        assert!(session.bfcache_token.is_none());
        assert_eq!(jar.get("bfguard_session"), None);
    }

    #[test]
    fn test_login_without_scripting_proof_fails_closed() {
        let jar = SharedCookieJar::new();
        let session = manager().login(&jar, 1, true, Utc::now()).unwrap();

        assert!(session.bfcache_token.is_none());
        assert_eq!(jar.get("bfguard_session"), None);
    }

    #[test]
    fn test_relogin_rotates_token() {
        let jar = jar_with_scripting_proof();
        let manager = manager();
        let first = manager.login(&jar, 1, true, Utc::now()).unwrap();
        let second = manager.login(&jar, 2, true, Utc::now()).unwrap();

        assert_ne!(first.bfcache_token, second.bfcache_token);
        assert_eq!(
            jar.get("bfguard_session"),
            Some(second.bfcache_token.unwrap().as_str().to_string())
        );
    }

    #[test]
    fn test_logout_clears_cookie() {
        let jar = jar_with_scripting_proof();
        let manager = manager();
        manager.login(&jar, 1, true, Utc::now()).unwrap();

        manager.logout(&jar).unwrap();
        assert_eq!(jar.get("bfguard_session"), None);
    }

    #[test]
    fn test_logout_covers_both_paths_when_distinct() {
        let config = AppConfig { cookie_path: "/app".into(), ..Default::default() };
        let manager = SessionManager::new(config);
        let headers = manager.logout(&SharedCookieJar::new()).unwrap();

        assert_eq!(headers.len(), 2);
        assert!(headers[0].contains("Path=/app"));
        assert!(headers[1].contains("Path=/"));
    }

    #[test]
    fn test_reissue_restores_deleted_cookie() {
        let jar = jar_with_scripting_proof();
        let manager = manager();
        let session = manager.login(&jar, 1, true, Utc::now()).unwrap();

        jar.apply_set_cookie("bfguard_session=");
        assert!(manager.reissue_cookie_if_missing(&session, &jar, Utc::now()).unwrap());
        assert_eq!(
            jar.get("bfguard_session"),
            Some(session.bfcache_token.unwrap().as_str().to_string())
        );
    }

    #[test]
    fn test_reissue_noop_when_cookie_present_or_no_token() {
        let jar = jar_with_scripting_proof();
        let manager = manager();
        let session = manager.login(&jar, 1, true, Utc::now()).unwrap();
        assert!(!manager.reissue_cookie_if_missing(&session, &jar, Utc::now()).unwrap());

        let anonymous = AuthSession { user_id: 2, remember_me: false, bfcache_token: None };
        assert!(!manager.reissue_cookie_if_missing(&anonymous, &jar, Utc::now()).unwrap());
    }

    #[test]
    fn test_token_cookie_is_never_http_only_and_secure_by_scheme() {
        let jar = jar_with_scripting_proof();
        let manager = manager();
        let session = manager.login(&jar, 1, true, Utc::now()).unwrap();
        let headers = manager
            .token_cookie_headers(session.bfcache_token.as_ref().unwrap(), Utc::now())
            .unwrap();

        assert!(headers[0].contains("; Secure"));
        assert!(!headers[0].contains("HttpOnly"));
    }

    #[test]
    fn test_guard_payload_mirrors_config() {
        let config = AppConfig { debug: true, ..Default::default() };
        let payload = SessionManager::new(config).guard_payload();
        assert_eq!(payload.cookie_name, "bfguard_session");
        assert_eq!(payload.channel_name, "bfguard_login");
        assert!(payload.debug);
    }
}
