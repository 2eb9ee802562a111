//! Debug-gated observability for the restore protocol.
//!
//! Production deployments run silent; when the debug flag is set the
//! guard reports replays, invalidations, and the environment's own
//! reasons for refusing a prior restoration. An invalidation necessarily
//! destroys the page that detected it, so the fact is parked in the
//! carryover store and reported by the fresh instance after the reload.

use crate::env::{CarryoverStore, PageSurface};

/// Carryover key marking that the previous instance invalidated itself.
pub(crate) const INVALIDATED_MARKER_KEY: &str = "bfguard_invalidated";

/// Diagnostics surface for one page instance.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Report how this page show came about, consuming any pending
    /// invalidation marker left by a predecessor instance.
    pub(crate) fn on_page_show<S: CarryoverStore>(self, replayed: bool, store: Option<&S>) {
        if !self.enabled {
            return;
        }
        if replayed {
            tracing::info!("page restored from snapshot");
        } else if let Some(store) = store
            && store.read(INVALIDATED_MARKER_KEY).is_some()
        {
            tracing::info!("page was invalidated by the restore check and reloaded");
        }
        if let Some(store) = store {
            store.remove(INVALIDATED_MARKER_KEY);
        }
    }

    /// Park the invalidation fact for the successor instance.
    pub(crate) fn mark_invalidated<S: CarryoverStore>(self, store: Option<&S>) {
        if !self.enabled {
            return;
        }
        if let Some(store) = store {
            store.write(INVALIDATED_MARKER_KEY, "1");
        }
        tracing::info!("fingerprint mismatch on restore; invalidating page");
    }

    /// Surface the environment's refusal reasons for a prior restoration.
    pub(crate) fn report_not_restored_reasons<P: PageSurface>(self, page: &P) {
        if !self.enabled {
            return;
        }
        if let Some(reasons) = page.not_restored_reasons() {
            tracing::warn!(?reasons, "previous navigation was not restored from snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryCarryover;

    #[test]
    fn test_marker_round_trip() {
        let store = MemoryCarryover::new();
        let diagnostics = Diagnostics::new(true);

        diagnostics.mark_invalidated(Some(&store));
        assert_eq!(store.read(INVALIDATED_MARKER_KEY), Some("1".to_string()));

        diagnostics.on_page_show(false, Some(&store));
        assert_eq!(store.read(INVALIDATED_MARKER_KEY), None);
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let store = MemoryCarryover::new();
        let diagnostics = Diagnostics::new(false);

        diagnostics.mark_invalidated(Some(&store));
        assert_eq!(store.read(INVALIDATED_MARKER_KEY), None);
    }
}
