//! Client-side staleness detection for bfcache'd authenticated pages.
//!
//! This crate implements the per-page-instance protocol that makes it
//! safe to let a browser keep full in-memory snapshots of authenticated
//! pages: a [`SnapshotGuard`] armed with the session fingerprint at load
//! time, a cross-tab [`topic`] the login surface broadcasts on, and the
//! login-surface [`login`] components (announcement and the scripting
//! opt-in recorder).
//!
//! Platform capabilities (cookie reads, survivable storage, content
//! clearing, reload) sit behind traits in [`env`] so the guard is
//! correct with or without any of them, and so tests can construct
//! independent page instances.

pub mod diagnostics;
pub mod env;
pub mod guard;
pub mod login;
pub mod topic;

pub use env::{CarryoverStore, FingerprintSource, PageSurface};
pub use guard::{GuardData, PageShow, ShowOutcome, SnapshotGuard};
pub use login::{OptInRecorder, announce_login_surface};
pub use topic::{TopicRegistry, TopicSubscription};
