//! bfguard-sim: scripted end-to-end run of the coherence shim.
//!
//! Drives the whole protocol in-process with the simulated browser
//! environment: scripting opt-in at login, token issuance, header
//! relaxation, cross-tab eviction broadcast, and the restore checks
//! that catch a rotated identity. Logging goes to stderr.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use bfguard_client::env::{CookieFingerprint, MemoryCarryover, RecordingPage, SharedCookieJar};
use bfguard_client::{OptInRecorder, PageShow, SnapshotGuard, TopicRegistry, TopicSubscription, announce_login_surface};
use bfguard_core::AppConfig;
use bfguard_server::{SessionManager, headers, relax_response_headers};

/// One simulated authenticated tab.
struct Tab {
    guard: SnapshotGuard<CookieFingerprint, MemoryCarryover, RecordingPage>,
    page: RecordingPage,
    carryover: MemoryCarryover,
    subscription: TopicSubscription,
}

fn open_tab(name: &str, manager: &SessionManager, jar: &SharedCookieJar, registry: &TopicRegistry) -> Tab {
    let payload = manager.guard_payload();
    tracing::info!(
        tab = name,
        payload = %serde_json::to_string(&payload).unwrap_or_default(),
        "authenticated page loaded"
    );

    let page = RecordingPage::new();
    let carryover = MemoryCarryover::new();
    let subscription = registry.subscribe(&payload.channel_name);
    let fingerprint = CookieFingerprint::new(jar.clone(), &payload.cookie_name);
    let mut guard = SnapshotGuard::arm(payload, fingerprint, Some(carryover.clone()), page.clone());
    guard.on_page_show(PageShow { replayed: false });

    Tab { guard, page, carryover, subscription }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;
    let jar = SharedCookieJar::new();
    let registry = TopicRegistry::new();
    let manager = SessionManager::new(config.clone());

    // User A reaches the login surface with scripting available.
    announce_login_surface(&registry, &config.login_channel_name);
    let recorder = OptInRecorder::new(
        jar.clone(),
        &config.scripting_cookie_name,
        &config.cookie_path,
        &config.site_cookie_path,
        &config.login_post_url,
    )?;
    recorder.on_form_submit(&config.login_post_url, &config.login_post_url)?;

    let session_a = manager.login(&jar, 1, true, Utc::now())?;
    tracing::info!(token_issued = session_a.bfcache_token.is_some(), "user A logged in");

    // The session qualifies, so authenticated responses lose no-store.
    let mut response_headers = BTreeMap::from([(
        headers::CACHE_CONTROL.to_string(),
        "no-cache, must-revalidate, max-age=0, no-store, private".to_string(),
    )]);
    let relaxed = relax_response_headers(&mut response_headers, Some(&session_a));
    tracing::info!(relaxed, cache_control = %response_headers[headers::CACHE_CONTROL], "response headers");

    let mut tab1 = open_tab("tab1", &manager, &jar, &registry);
    let mut tab2 = open_tab("tab2", &manager, &jar, &registry);

    // A second visitor reaches the login surface; both open tabs see the
    // broadcast and refresh their carryover data.
    let delivered = announce_login_surface(&registry, &config.login_channel_name);
    tracing::info!(delivered, "login surface announced to open tabs");
    for tab in [&mut tab1, &mut tab2] {
        tab.subscription.recv().await?;
        tab.guard.on_eviction_message();
    }

    // The visitor logs in as user B; the fingerprint rotates.
    recorder.on_form_submit(&config.login_post_url, &config.login_post_url)?;
    manager.login(&jar, 2, true, Utc::now())?;
    tracing::info!("user B logged in; fingerprint rotated");

    // Tab 1 is restored from a full snapshot: the in-memory capture
    // disagrees with the live cookie and the page self-destructs.
    let outcome = tab1.guard.on_page_show(PageShow { replayed: true });
    tracing::info!(?outcome, actions = ?tab1.page.actions(), "tab1 snapshot restore");

    // Tab 2 comes back through reconstruction-from-cache: its script
    // heap is gone, and the carryover value catches the mismatch.
    let page = RecordingPage::new();
    let mut rebuilt = SnapshotGuard::resume(
        manager.guard_payload(),
        CookieFingerprint::new(jar.clone(), &config.session_cookie_name),
        tab2.carryover.clone(),
        page.clone(),
    );
    let outcome = rebuilt.on_page_show(PageShow { replayed: true });
    tracing::info!(?outcome, actions = ?page.actions(), "tab2 reconstruction restore");

    // Logout clears the fingerprint; a replay of tab 2's original
    // snapshot is refused because its capture predates the logout.
    manager.logout(&jar)?;
    let outcome = tab2.guard.on_page_show(PageShow { replayed: true });
    tracing::info!(?outcome, actions = ?tab2.page.actions(), "tab2 replay after logout");

    Ok(())
}
