//! Login-surface components.
//!
//! Two things run only on the unauthenticated entry point: the arrival
//! announcement on the eviction topic, and the opt-in recorder that
//! proves scripting capability to the server before authentication.

use url::Url;

use bfguard_core::{CookieAttributes, Error, set_cookie_header};

use crate::env::SharedCookieJar;
use crate::topic::TopicRegistry;

/// Announce that an unauthenticated viewer reached the login surface.
///
/// One message per arrival; the payload is irrelevant. This is published
/// unconditionally rather than only for genuinely unauthenticated
/// viewers: an authenticated user who navigates to the login surface is
/// about to re-authenticate anyway, and only unauthenticated users
/// normally land here.
///
/// Returns the number of subscribed pages the message reached. Zero is
/// normal when no authenticated tabs are open, and callers must not
/// depend on delivery having had any effect.
pub fn announce_login_surface(registry: &TopicRegistry, channel_name: &str) -> usize {
    let delivered = registry.publish(channel_name);
    tracing::debug!(channel = channel_name, delivered, "login surface announced");
    delivered
}

/// Records scripting capability when the login form is submitted.
///
/// The server relaxes cache headers for a session only when the client
/// proved it can run the restore check at all; without scripting the
/// fail-closed policy keeps `no-store` in place. The proof is a cookie
/// set at form submission, session-scoped (no expiry) because it only
/// needs to live until the server inspects it during login.
///
/// A cookie is used rather than a hidden form field because interstitial
/// login flows (two-factor prompts and the like) tend to drop hidden
/// fields on their way to the final authenticated state.
#[derive(Debug, Clone)]
pub struct OptInRecorder {
    jar: SharedCookieJar,
    cookie_name: String,
    cookie_path: String,
    site_cookie_path: String,
    login_post_url: Url,
}

impl OptInRecorder {
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `login_post_url` is not an
    /// absolute URL.
    pub fn new(
        jar: SharedCookieJar, cookie_name: impl Into<String>, cookie_path: impl Into<String>,
        site_cookie_path: impl Into<String>, login_post_url: &str,
    ) -> Result<Self, Error> {
        let login_post_url = Url::parse(login_post_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            jar,
            cookie_name: cookie_name.into(),
            cookie_path: cookie_path.into(),
            site_cookie_path: site_cookie_path.into(),
            login_post_url,
        })
    }

    /// Handle a form submission on the login surface.
    ///
    /// Sets the scripting-capability cookie when the submitted form's
    /// action resolves to the configured login POST URL by origin and
    /// path. Other forms on the page (search, password reset) must not
    /// set it. Returns the `Set-Cookie` strings written, empty when the
    /// form did not match.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the action cannot be resolved
    /// against the current page URL.
    pub fn on_form_submit(&self, form_action: &str, page_url: &str) -> Result<Vec<String>, Error> {
        let base = Url::parse(page_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let action = base.join(form_action).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if action.origin() != self.login_post_url.origin() || action.path() != self.login_post_url.path() {
            return Ok(Vec::new());
        }

        let mut paths = vec![self.cookie_path.clone()];
        if self.site_cookie_path != self.cookie_path {
            paths.push(self.site_cookie_path.clone());
        }

        let mut written = Vec::with_capacity(paths.len());
        for path in paths {
            let attributes = CookieAttributes { path, expires: None, secure: false };
            let header = set_cookie_header(&self.cookie_name, "1", &attributes)?;
            self.jar.apply_set_cookie(&header);
            written.push(header);
        }
        tracing::debug!(cookie = %self.cookie_name, "scripting capability recorded");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(jar: &SharedCookieJar) -> OptInRecorder {
        OptInRecorder::new(
            jar.clone(),
            "bfguard_js_enabled",
            "/",
            "/",
            "https://example.com/login",
        )
        .unwrap()
    }

    #[test]
    fn test_matching_form_sets_cookie() {
        let jar = SharedCookieJar::new();
        let written = recorder(&jar)
            .on_form_submit("/login", "https://example.com/login?redirect=%2F")
            .unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(jar.get("bfguard_js_enabled"), Some("1".to_string()));
    }

    #[test]
    fn test_query_string_on_action_is_ignored() {
        let jar = SharedCookieJar::new();
        let written = recorder(&jar)
            .on_form_submit("https://example.com/login?action=postpass", "https://example.com/login")
            .unwrap();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn test_foreign_origin_does_not_set_cookie() {
        let jar = SharedCookieJar::new();
        let written = recorder(&jar)
            .on_form_submit("https://evil.example.net/login", "https://example.com/login")
            .unwrap();

        assert!(written.is_empty());
        assert_eq!(jar.get("bfguard_js_enabled"), None);
    }

    #[test]
    fn test_other_form_on_page_does_not_set_cookie() {
        let jar = SharedCookieJar::new();
        let written = recorder(&jar)
            .on_form_submit("/password-reset", "https://example.com/login")
            .unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_both_cookie_paths_written_when_distinct() {
        let jar = SharedCookieJar::new();
        let recorder = OptInRecorder::new(
            jar.clone(),
            "bfguard_js_enabled",
            "/app",
            "/",
            "https://example.com/login",
        )
        .unwrap();

        let written = recorder.on_form_submit("/login", "https://example.com/login").unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].contains("Path=/app"));
        assert!(written[1].contains("Path=/"));
    }

    #[test]
    fn test_announce_reaches_subscribed_pages() {
        let registry = TopicRegistry::new();
        let mut tab = registry.subscribe("bfguard_login");

        let delivered = announce_login_surface(&registry, "bfguard_login");

        assert_eq!(delivered, 1);
        assert!(tab.try_drain());
    }

    #[test]
    fn test_announce_with_no_tabs_open() {
        let registry = TopicRegistry::new();
        assert_eq!(announce_login_surface(&registry, "bfguard_login"), 0);
    }
}
