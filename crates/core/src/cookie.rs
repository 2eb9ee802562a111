//! Cookie header parsing and Set-Cookie construction.
//!
//! The fingerprint cookie must be readable from script and its read must
//! be synchronous and side-effect free, so the client side works on the
//! raw `Cookie` request-header string rather than an async cookie store.

use chrono::{DateTime, Utc};

use crate::error::Error;

/// Attributes for a `Set-Cookie` header.
///
/// The fingerprint cookie is intentionally never HTTP-only: the whole
/// point is that page script can read it. Whether it is marked
/// transport-secure is a deployment decision (see `AppConfig`).
#[derive(Debug, Clone, Default)]
pub struct CookieAttributes {
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
}

/// Read a named cookie value out of a `Cookie` header string.
///
/// Matches the same grammar as the client-side check: the name anchored
/// at the start of the header or after a `;` separator, with the value
/// running to the next `;`. Returns `None` when the cookie is absent or
/// its value is empty.
pub fn read_cookie(header: &str, name: &str) -> Option<String> {
    for pair in header.split(';') {
        let pair = pair.trim_start();
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key == name && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Build a `Set-Cookie` header value.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the cookie name is empty or contains
/// a separator character.
pub fn set_cookie_header(name: &str, value: &str, attributes: &CookieAttributes) -> Result<String, Error> {
    if name.is_empty() || name.contains([';', '=', ' ']) {
        return Err(Error::InvalidInput(format!("invalid cookie name: {name:?}")));
    }

    let mut header = format!("{name}={value}");
    if !attributes.path.is_empty() {
        header.push_str("; Path=");
        header.push_str(&attributes.path);
    }
    if let Some(expires) = attributes.expires {
        header.push_str("; Expires=");
        header.push_str(&expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
    }
    if attributes.secure {
        header.push_str("; Secure");
    }
    Ok(header)
}

/// Build a `Set-Cookie` header that deletes the named cookie.
///
/// Uses an expiry far in the past, mirroring how the cookie was cleared
/// on logout in the source deployment.
pub fn clear_cookie_header(name: &str, path: &str) -> Result<String, Error> {
    let attributes = CookieAttributes {
        path: path.to_string(),
        expires: Some(DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_else(Utc::now)),
        secure: false,
    };
    set_cookie_header(name, "", &attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie_first_position() {
        let header = "bfguard_session=tokA; other=1";
        assert_eq!(read_cookie(header, "bfguard_session"), Some("tokA".to_string()));
    }

    #[test]
    fn test_read_cookie_after_separator() {
        let header = "other=1; bfguard_session=tokB";
        assert_eq!(read_cookie(header, "bfguard_session"), Some("tokB".to_string()));
    }

    #[test]
    fn test_read_cookie_absent() {
        assert_eq!(read_cookie("other=1", "bfguard_session"), None);
        assert_eq!(read_cookie("", "bfguard_session"), None);
    }

    #[test]
    fn test_read_cookie_empty_value_is_absent() {
        assert_eq!(read_cookie("bfguard_session=; other=1", "bfguard_session"), None);
    }

    #[test]
    fn test_read_cookie_name_is_not_a_prefix_match() {
        let header = "bfguard_session_extra=tokX";
        assert_eq!(read_cookie(header, "bfguard_session"), None);
    }

    #[test]
    fn test_set_cookie_header_attributes() {
        let attributes = CookieAttributes {
            path: "/".to_string(),
            expires: Some(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()),
            secure: true,
        };
        let header = set_cookie_header("bfguard_session", "tokA", &attributes).unwrap();
        assert!(header.starts_with("bfguard_session=tokA; Path=/; Expires="));
        assert!(header.ends_with("; Secure"));
        assert!(!header.contains("HttpOnly"));
    }

    #[test]
    fn test_set_cookie_header_rejects_bad_name() {
        let result = set_cookie_header("bad name", "v", &CookieAttributes::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_clear_cookie_header_expires_in_past() {
        let header = clear_cookie_header("bfguard_session", "/").unwrap();
        assert!(header.starts_with("bfguard_session=; Path=/; Expires=Thu, 01 Jan 1970"));
    }
}
