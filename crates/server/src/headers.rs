//! Cache-Control relaxation for eligible responses.
//!
//! Authenticated responses are conventionally sent with `no-store`,
//! which also forbids the browser's own back/forward snapshot. Removing
//! `no-store` re-enables the snapshot; the directives merged in keep the
//! response out of every shared cache, so the only copy that can exist
//! afterwards is the in-memory one the client-side guard polices.

use std::collections::BTreeMap;

use crate::session::AuthSession;

/// Header this module rewrites.
pub const CACHE_CONTROL: &str = "Cache-Control";

/// Directives merged in when `no-store` is removed. `private` is the
/// load-bearing one for shared caches; the rest force revalidation so a
/// stored copy is never served stale.
const RELAXED_DIRECTIVES: [&str; 4] = ["private", "no-cache", "max-age=0", "must-revalidate"];

/// Rewrite a `Cache-Control` value to permit bfcache storage.
///
/// Removes `no-store` (and `public`, since `private` is added) and
/// merges in the directives that keep the response out of shared
/// caches, preserving unrelated directives and avoiding duplicates.
/// Returns `None` when the value carries no `no-store`, in which case
/// the header must be left untouched.
pub fn relax_cache_control(value: &str) -> Option<String> {
    let mut directives: Vec<&str> = value.split(',').map(str::trim).filter(|d| !d.is_empty()).collect();

    if !directives.contains(&"no-store") {
        return None;
    }

    directives.retain(|d| *d != "no-store" && *d != "public");
    for needed in RELAXED_DIRECTIVES {
        if !directives.contains(&needed) {
            directives.push(needed);
        }
    }

    Some(directives.join(", "))
}

/// Relax the cache-prevention headers of one response.
///
/// For a logged-in session this is contingent on the session holding a
/// bfcache token: a session that never proved scripting capability keeps
/// `no-store`, because its pages could never be invalidated after
/// logout. Anonymous responses that carry `no-store` (some applications
/// send it on anonymous checkout or account pages) are relaxed
/// unconditionally, since the substituted directives still keep them
/// out of shared caches.
///
/// Returns whether the header was rewritten.
pub fn relax_response_headers(headers: &mut BTreeMap<String, String>, session: Option<&AuthSession>) -> bool {
    let Some(value) = headers.get(CACHE_CONTROL) else {
        return false;
    };

    if let Some(session) = session
        && session.bfcache_token.is_none()
    {
        tracing::debug!(user_id = session.user_id, "session has no bfcache token; keeping no-store");
        return false;
    }

    match relax_cache_control(value) {
        Some(relaxed) => {
            headers.insert(CACHE_CONTROL.to_string(), relaxed);
            true
        }
        None => false,
    }
}
