//! User display preferences: colour theme and interface language.
//!
//! Both preferences are small closed enumerations that travel through the
//! same places (a user column, a cookie, a request header), so the shared
//! behaviour lives on the [`Preference`] trait and the resolution logic in
//! the web crate is written once against it.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A user preference drawn from a fixed set of values.
pub trait Preference: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Short name used in logs (`"theme"`, `"language"`).
    const KIND: &'static str;

    /// Name of the cookie holding the browser-side copy of the value.
    const COOKIE_NAME: &'static str;

    /// Request header consulted for the system default.
    const HEADER: &'static str;

    /// Every value the application supports.
    const SUPPORTED: &'static [Self];

    /// The canonical string form, as stored in the database and cookie.
    fn as_str(self) -> &'static str;

    /// Value to fall back to when neither the user record nor the cookie
    /// has one, derived from the raw [`Self::HEADER`] value if present.
    fn system_default(header: Option<&str>) -> Self;

    /// Parse a stored or transmitted value.
    ///
    /// Anything outside [`Self::SUPPORTED`] (legacy values, tampered cookies)
    /// yields `None` rather than an error: callers treat it as absent.
    #[must_use]
    fn parse(raw: &str) -> Option<Self> {
        Self::SUPPORTED.iter().copied().find(|v| v.as_str() == raw)
    }
}

/// Colour theme.
///
/// `System` defers the light/dark decision to the browser's
/// `prefers-color-scheme`, which the server cannot observe reliably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Preference for Theme {
    const KIND: &'static str = "theme";
    const COOKIE_NAME: &'static str = "NEXT_THEME";
    const HEADER: &'static str = "prefers-color-scheme";
    const SUPPORTED: &'static [Self] = &[Self::Light, Self::Dark, Self::System];

    fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    /// Always `System`; the header is ignored.
    fn system_default(_header: Option<&str>) -> Self {
        Self::System
    }
}

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Fr,
    #[default]
    En,
}

impl Locale {
    /// Pick the first supported language listed in an `Accept-Language`
    /// header.
    ///
    /// Region subtags are dropped (`fr-CA` counts as `fr`) and matching is
    /// case-insensitive. Quality weights are ignored: list order alone
    /// decides, so `en;q=0.1, fr;q=0.9` resolves to `en`.
    ///
    /// ```
    /// use metamorph_core::Locale;
    ///
    /// assert_eq!(Locale::from_accept_language(Some("fr-FR,fr;q=0.9,en;q=0.8")), Locale::Fr);
    /// assert_eq!(Locale::from_accept_language(Some("de-DE,de;q=0.9")), Locale::En);
    /// assert_eq!(Locale::from_accept_language(None), Locale::En);
    /// ```
    #[must_use]
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self::default();
        };

        header
            .split(',')
            .filter_map(|entry| {
                let tag = entry.split(';').next()?.trim();
                let primary = tag.split('-').next()?;
                Self::parse(&primary.to_ascii_lowercase())
            })
            .next()
            .unwrap_or_default()
    }
}

impl Preference for Locale {
    const KIND: &'static str = "language";
    const COOKIE_NAME: &'static str = "NEXT_LOCALE";
    const HEADER: &'static str = "accept-language";
    const SUPPORTED: &'static [Self] = &[Self::Fr, Self::En];

    fn as_str(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
        }
    }

    fn system_default(header: Option<&str>) -> Self {
        Self::from_accept_language(header)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
