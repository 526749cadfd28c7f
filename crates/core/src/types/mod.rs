//! Core types for MetamorphUI.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod preference;

pub use email::{Email, EmailError};
pub use id::*;
pub use preference::{Locale, Preference, Theme};
