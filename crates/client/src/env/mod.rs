//! Platform capability abstractions.
//!
//! Which restore/eviction primitives a browser engine offers is treated
//! as unknown: the guard must behave correctly whether or not survivable
//! storage or the cross-tab channel exist. Each capability is therefore a
//! small trait, and absence is modeled by simply not wiring one in.
//!
//! All reads and writes here are synchronous. The evaluation that runs on
//! a restoration signal has to finish before the restored content paints,
//! so nothing in this module may await.

pub mod memory;

use bfguard_core::SessionToken;

pub use memory::{CookieFingerprint, MemoryCarryover, PageAction, RecordingPage, SharedCookieJar};

/// Synchronous, side-effect-free read of the live session fingerprint.
///
/// Backed by a script-readable cookie in a real deployment. Returns
/// `None` when no identity is authenticated (cookie absent or cleared).
pub trait FingerprintSource {
    fn read(&self) -> Option<SessionToken>;
}

/// Key-value storage that survives reconstruction-from-cache.
///
/// The bfcache path preserves the whole script heap, so ordinary fields
/// survive it; this store exists for the paths that rebuild the script
/// environment from scratch and only preserve input-like state. When the
/// backing mechanism is origin-wide rather than tab-scoped, writes are
/// last-writer-wins.
pub trait CarryoverStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// The visible page: content clearing and reload.
///
/// `clear_content` must take effect synchronously so that no stale
/// authenticated content can be glimpsed before the reload lands.
/// `request_reload` is fire-and-forget; the page instance is being
/// discarded regardless of the outcome.
pub trait PageSurface {
    fn clear_content(&self);
    fn request_reload(&self);

    /// The environment's reasons for refusing a prior snapshot
    /// restoration, when it exposes them.
    fn not_restored_reasons(&self) -> Option<Vec<String>> {
        None
    }
}
