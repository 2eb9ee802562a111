//! In-memory capability implementations.
//!
//! These back the tests and the end-to-end simulation binary. The cookie
//! jar is shared between simulated tabs and the simulated server, the
//! carryover store can be cloned into several page instances to model an
//! origin-wide mechanism, and the recording page captures the exact
//! order of visible side effects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bfguard_core::{SessionToken, read_cookie};

use super::{CarryoverStore, FingerprintSource, PageSurface};

/// A cookie jar shared across simulated tabs and the simulated server.
///
/// Stores name/value pairs the way a browser profile does: one value per
/// name, visible to every tab of the origin.
#[derive(Debug, Clone, Default)]
pub struct SharedCookieJar {
    cookies: Arc<Mutex<HashMap<String, String>>>,
}

impl SharedCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `Set-Cookie` header value to the jar.
    ///
    /// An empty value deletes the cookie, matching how the collaborator
    /// clears the fingerprint on logout (empty value, past expiry).
    pub fn apply_set_cookie(&self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let mut cookies = self.cookies.lock().expect("cookie jar poisoned");
        if value.is_empty() {
            cookies.remove(name);
        } else {
            cookies.insert(name.to_string(), value.to_string());
        }
    }

    /// The `Cookie` request-header string a page in this profile sees.
    pub fn cookie_header(&self) -> String {
        let cookies = self.cookies.lock().expect("cookie jar poisoned");
        let mut pairs: Vec<String> = cookies.iter().map(|(name, value)| format!("{name}={value}")).collect();
        pairs.sort();
        pairs.join("; ")
    }

    /// Read a single cookie value.
    pub fn get(&self, name: &str) -> Option<String> {
        read_cookie(&self.cookie_header(), name)
    }
}

/// Fingerprint source reading a named cookie from a shared jar.
#[derive(Debug, Clone)]
pub struct CookieFingerprint {
    jar: SharedCookieJar,
    cookie_name: String,
}

impl CookieFingerprint {
    pub fn new(jar: SharedCookieJar, cookie_name: impl Into<String>) -> Self {
        Self { jar, cookie_name: cookie_name.into() }
    }
}

impl FingerprintSource for CookieFingerprint {
    fn read(&self) -> Option<SessionToken> {
        self.jar.get(&self.cookie_name).and_then(SessionToken::new)
    }
}

/// Carryover storage backed by a shared map.
///
/// Clone it into multiple page instances to model an origin-wide store,
/// or construct one per instance to model tab-scoped storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCarryover {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCarryover {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CarryoverStore for MemoryCarryover {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("carryover store poisoned").get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("carryover store poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().expect("carryover store poisoned").remove(key);
    }
}

/// A visible page action, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    ContentCleared,
    ReloadRequested,
}

/// Page surface that records its actions for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingPage {
    actions: Arc<Mutex<Vec<PageAction>>>,
    not_restored_reasons: Option<Vec<String>>,
}

impl RecordingPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page whose previous restoration the environment refused.
    pub fn with_not_restored_reasons(reasons: Vec<String>) -> Self {
        Self { actions: Arc::default(), not_restored_reasons: Some(reasons) }
    }

    /// Everything that happened to the visible page, in order.
    pub fn actions(&self) -> Vec<PageAction> {
        self.actions.lock().expect("page actions poisoned").clone()
    }
}

impl PageSurface for RecordingPage {
    fn clear_content(&self) {
        self.actions
            .lock()
            .expect("page actions poisoned")
            .push(PageAction::ContentCleared);
    }

    fn request_reload(&self) {
        self.actions
            .lock()
            .expect("page actions poisoned")
            .push(PageAction::ReloadRequested);
    }

    fn not_restored_reasons(&self) -> Option<Vec<String>> {
        self.not_restored_reasons.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jar_apply_and_header() {
        let jar = SharedCookieJar::new();
        jar.apply_set_cookie("bfguard_session=tokA; Path=/; Secure");
        jar.apply_set_cookie("other=1");
        assert_eq!(jar.cookie_header(), "bfguard_session=tokA; other=1");
        assert_eq!(jar.get("bfguard_session"), Some("tokA".to_string()));
    }

    #[test]
    fn test_jar_empty_value_deletes() {
        let jar = SharedCookieJar::new();
        jar.apply_set_cookie("bfguard_session=tokA");
        jar.apply_set_cookie("bfguard_session=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(jar.get("bfguard_session"), None);
    }

    #[test]
    fn test_cookie_fingerprint_reads_jar() {
        let jar = SharedCookieJar::new();
        let source = CookieFingerprint::new(jar.clone(), "bfguard_session");
        assert_eq!(source.read(), None);

        jar.apply_set_cookie("bfguard_session=tokA");
        assert_eq!(source.read(), SessionToken::new("tokA"));
    }

    #[test]
    fn test_carryover_shared_between_clones() {
        let store = MemoryCarryover::new();
        let other = store.clone();
        store.write("key", "value");
        assert_eq!(other.read("key"), Some("value".to_string()));
        other.remove("key");
        assert_eq!(store.read("key"), None);
    }

    #[test]
    fn test_recording_page_preserves_order() {
        let page = RecordingPage::new();
        page.clear_content();
        page.request_reload();
        assert_eq!(page.actions(), vec![PageAction::ContentCleared, PageAction::ReloadRequested]);
    }
}
