//! Core types and shared functionality for bfguard.
//!
//! This crate provides:
//! - Session token generation and comparison
//! - Cookie header parsing and Set-Cookie construction
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod cookie;
pub mod error;
pub mod token;

pub use config::AppConfig;
pub use cookie::{CookieAttributes, clear_cookie_header, read_cookie, set_cookie_header};
pub use error::Error;
pub use token::SessionToken;
