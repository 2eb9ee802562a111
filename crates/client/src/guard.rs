//! The Snapshot Guard: per-page-instance staleness detection.
//!
//! A guard decides, each time this page instance's content becomes
//! visible, whether that content is still trustworthy for the currently
//! authenticated identity, and neutralizes it when it is not. It arms
//! itself once with the live fingerprint, watches for restoration
//! signals, and on each replayed show compares the fingerprint it
//! remembers against the live one. A mismatch clears the visible content
//! synchronously and requests one reload; the reload constructs a fresh
//! instance which starts over.
//!
//! Two remembered values exist because browsers restore pages two ways.
//! A true snapshot restore replays the whole script heap, so the value
//! captured in an ordinary field survives. Reconstruction from an
//! intermediate cache rebuilds the script environment from scratch and
//! only input-like state survives, so the value is also persisted in a
//! [`CarryoverStore`]. Exactly one of the two is authoritative per
//! occurrence: the in-memory capture when it is still populated, the
//! carryover otherwise.

use bfguard_core::SessionToken;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::env::{CarryoverStore, FingerprintSource, PageSurface};

/// Carryover key under which the fingerprint is persisted.
pub(crate) const CARRYOVER_TOKEN_KEY: &str = "bfguard_carryover_token";

/// Initialization payload handed to each page instance.
///
/// This record is the sole configuration surface the guard depends on
/// from its environment; it is serialized into the page by the server
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardData {
    /// Name of the fingerprint cookie.
    pub cookie_name: String,
    /// Name of the cross-tab eviction topic.
    pub channel_name: String,
    /// Whether the diagnostics surface is enabled.
    pub debug: bool,
}

/// One occurrence of the restoration signal.
///
/// `replayed` is false for an ordinary fresh navigation; only replay
/// occurrences are evaluated.
#[derive(Debug, Clone, Copy)]
pub struct PageShow {
    pub replayed: bool,
}

/// What a page-show occurrence resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// Not a replay; no evaluation was performed.
    FreshNavigation,
    /// Replay evaluated, fingerprints matched, content kept.
    Retained,
    /// Replay evaluated, fingerprints differed; content was cleared and
    /// a reload was requested.
    Invalidated,
    /// A previous occurrence already invalidated this instance.
    AlreadyInvalidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Watching,
    Invalidated,
}

/// Per-page-instance staleness detector.
///
/// Construct with [`SnapshotGuard::arm`] on a fresh page load, or with
/// [`SnapshotGuard::resume`] when modeling a page whose script
/// environment was rebuilt from an intermediate cache (memory lost,
/// carryover authoritative).
pub struct SnapshotGuard<F, S, P> {
    data: GuardData,
    fingerprint: F,
    carryover: Option<S>,
    page: P,
    /// `Some` while this instance's memory is intact; the inner value is
    /// the fingerprint at construction (`None` = unauthenticated). Set
    /// once, never reassigned.
    captured: Option<Option<SessionToken>>,
    state: GuardState,
    diagnostics: Diagnostics,
}

impl<F, S, P> SnapshotGuard<F, S, P>
where
    F: FingerprintSource,
    S: CarryoverStore,
    P: PageSurface,
{
    /// Arm a guard for a freshly constructed page instance.
    ///
    /// Captures the live fingerprint and persists it to the carryover
    /// store when one is available. Passing `None` for the store models
    /// an environment without survivable storage; the guard degrades to
    /// memory-only protection.
    pub fn arm(data: GuardData, fingerprint: F, carryover: Option<S>, page: P) -> Self {
        let diagnostics = Diagnostics::new(data.debug);
        diagnostics.report_not_restored_reasons(&page);

        let captured = fingerprint.read();
        let guard = Self {
            data,
            fingerprint,
            carryover,
            page,
            captured: Some(captured),
            state: GuardState::Watching,
            diagnostics,
        };
        guard.persist_carryover(guard.captured.clone().flatten().as_ref());
        guard
    }

    /// Arm a guard for a page instance rebuilt from an intermediate
    /// cache: the script heap was lost, so the carryover store holds the
    /// authoritative prior fingerprint.
    pub fn resume(data: GuardData, fingerprint: F, carryover: S, page: P) -> Self {
        let diagnostics = Diagnostics::new(data.debug);
        diagnostics.report_not_restored_reasons(&page);

        Self {
            data,
            fingerprint,
            carryover: Some(carryover),
            page,
            captured: None,
            state: GuardState::Watching,
            diagnostics,
        }
    }

    /// The initialization payload this guard was constructed with.
    pub fn data(&self) -> &GuardData {
        &self.data
    }

    /// Whether this instance has invalidated itself.
    pub fn is_invalidated(&self) -> bool {
        self.state == GuardState::Invalidated
    }

    /// React to one page-show occurrence.
    ///
    /// Runs to completion synchronously: read, compare, act. A replayed
    /// show with a changed fingerprint clears the visible content before
    /// the reload request is issued, in that order. The subscription is
    /// not one-shot; every subsequent restoration of the same instance
    /// is re-checked.
    pub fn on_page_show(&mut self, show: PageShow) -> ShowOutcome {
        self.diagnostics.on_page_show(show.replayed, self.carryover.as_ref());

        if !show.replayed {
            // Ordinary navigation: refresh the carryover so it is
            // available at the next restoration, and do not evaluate.
            let current = self.current_authoritative();
            self.persist_carryover(current.as_ref());
            return ShowOutcome::FreshNavigation;
        }

        if self.state == GuardState::Invalidated {
            // The reload navigation supersedes everything; a second
            // clear/reload cycle must not run.
            return ShowOutcome::AlreadyInvalidated;
        }

        let prior = self.prior_fingerprint();
        let live = self.fingerprint.read();

        if prior == live {
            self.persist_carryover(live.as_ref());
            return ShowOutcome::Retained;
        }

        self.invalidate();
        ShowOutcome::Invalidated
    }

    /// React to a delivery on the eviction topic.
    ///
    /// The handler running at all proves this page is not frozen, so the
    /// carryover is refreshed from the live fingerprint; if this engine
    /// does not evict on delivery, the next evaluation still has fresh
    /// data. The message payload is irrelevant and the in-memory capture
    /// is left untouched.
    pub fn on_eviction_message(&mut self) {
        if self.state == GuardState::Invalidated {
            return;
        }
        let live = self.fingerprint.read();
        self.persist_carryover(live.as_ref());
        tracing::debug!(channel = %self.data.channel_name, "eviction topic delivery; carryover refreshed");
    }

    /// The value the current page content was produced for.
    fn prior_fingerprint(&self) -> Option<SessionToken> {
        match &self.captured {
            Some(value) => value.clone(),
            None => self
                .carryover
                .as_ref()
                .and_then(|store| store.read(CARRYOVER_TOKEN_KEY))
                .and_then(SessionToken::new),
        }
    }

    /// The value a non-replay show should persist: the capture while
    /// memory is intact, the live fingerprint after memory loss.
    fn current_authoritative(&self) -> Option<SessionToken> {
        match &self.captured {
            Some(value) => value.clone(),
            None => self.fingerprint.read(),
        }
    }

    fn persist_carryover(&self, value: Option<&SessionToken>) {
        let Some(store) = &self.carryover else {
            return;
        };
        match value {
            Some(token) => store.write(CARRYOVER_TOKEN_KEY, token.as_str()),
            None => store.remove(CARRYOVER_TOKEN_KEY),
        }
    }

    fn invalidate(&mut self) {
        self.state = GuardState::Invalidated;
        self.diagnostics.mark_invalidated(self.carryover.as_ref());

        // Drop the persisted value first: engines that preserve input
        // state across reloads would otherwise re-detect the mismatch on
        // the reloaded page and loop.
        if let Some(store) = &self.carryover {
            store.remove(CARRYOVER_TOKEN_KEY);
        }

        // Content must be blanked before anything else runs; the reload
        // request comes after and is fire-and-forget.
        self.page.clear_content();
        self.page.request_reload();
    }
}
