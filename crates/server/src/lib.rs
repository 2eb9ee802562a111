//! Server collaborator for the bfcache coherence shim.
//!
//! This crate owns the behaviors the client side consumes but never
//! implements: issuing and clearing the fingerprint cookie as the
//! authenticated identity changes, and relaxing the cache-prevention
//! headers for sessions that proved they can run the restore check.

pub mod headers;
pub mod session;

pub use headers::{relax_cache_control, relax_response_headers};
pub use session::{AuthSession, SessionManager};
