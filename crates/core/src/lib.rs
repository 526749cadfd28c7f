//! MetamorphUI Core - Shared types library.
//!
//! This crate provides common types used across all MetamorphUI components:
//! - `web` - The HTTP server (auth, preferences, dashboard)
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, validated emails, and the user preference enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
