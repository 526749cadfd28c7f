//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup, email verification, password and OAuth login, auth tokens
//! - `email` - Verification email delivery
//! - `identity` - Who is making the request
//! - `oauth` - Google and GitHub authorization-code flow
//! - `preferences` - Theme and language resolution

pub mod auth;
pub mod email;
pub mod identity;
pub mod oauth;
pub mod preferences;
