//! Display preference resolution.
//!
//! Theme and language are resolved the same way on every request:
//!
//! | signed in | stored | cookie | result                  | store write |
//! |-----------|--------|--------|-------------------------|-------------|
//! | yes       | yes    | any    | stored value            | no          |
//! | yes       | no     | yes    | cookie value            | yes         |
//! | yes       | no     | no     | system default          | yes         |
//! | no        | -      | yes    | cookie value            | no          |
//! | no        | -      | no     | system default          | no          |
//!
//! A stored value is never overwritten here, even when reading it failed:
//! write-back goes through [`PreferenceStore::fill`]. Only [`save`] changes it.
//! Store failures never fail a request: reads count as "nothing stored"
//! and writes are logged and dropped.

mod store;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use metamorph_core::{Preference, UserId};

use crate::db::RepositoryError;

pub use store::{PgPreferenceStore, PreferenceColumn};

/// Lifetime of the preference cookies.
const COOKIE_MAX_AGE: time::Duration = time::Duration::days(365);

/// Persistent per-user storage for one preference kind.
///
/// `load` returns the raw stored text; validation happens in the chain so
/// every store gets the same treatment of unknown values.
pub trait PreferenceStore<P: Preference>: Sync {
    /// Read the stored value for `user_id`, if any.
    fn load(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Overwrite the stored value for `user_id`.
    fn store(
        &self,
        user_id: UserId,
        value: P,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Store `value` only if `user_id` has no supported value yet.
    ///
    /// Returns whether anything was written. Never replaces a valid stored
    /// value, even one the caller failed to read.
    fn fill(
        &self,
        user_id: UserId,
        value: P,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// What the chain knows about the current request.
#[derive(Debug, Clone, Copy)]
pub struct PreferenceContext<'a> {
    /// The signed-in user, as found by whichever identity lookup the caller uses.
    pub user_id: Option<UserId>,
    pub cookies: &'a CookieJar,
    pub headers: &'a HeaderMap,
}

impl<'a> PreferenceContext<'a> {
    #[must_use]
    pub const fn new(
        user_id: Option<UserId>,
        cookies: &'a CookieJar,
        headers: &'a HeaderMap,
    ) -> Self {
        Self {
            user_id,
            cookies,
            headers,
        }
    }

    fn system_default<P: Preference>(&self) -> P {
        let header = self.headers.get(P::HEADER).and_then(|v| v.to_str().ok());
        P::system_default(header)
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceSource {
    Stored,
    Cookie,
    Default,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<P> {
    pub value: P,
    pub source: PreferenceSource,
    /// Whether the value was written back to the store. The write may have failed.
    pub write_attempted: bool,
}

/// Resolve the effective value of `P` for the request described by `ctx`.
pub async fn resolve<P, S>(store: &S, ctx: &PreferenceContext<'_>) -> Resolution<P>
where
    P: Preference,
    S: PreferenceStore<P>,
{
    let cookie = read_cookie::<P>(ctx.cookies);

    let Some(user_id) = ctx.user_id else {
        let (value, source) = cookie.map_or_else(
            || (ctx.system_default(), PreferenceSource::Default),
            |v| (v, PreferenceSource::Cookie),
        );
        return Resolution {
            value,
            source,
            write_attempted: false,
        };
    };

    if let Some(value) = read_stored(store, user_id).await {
        return Resolution {
            value,
            source: PreferenceSource::Stored,
            write_attempted: false,
        };
    }

    let (value, source) = cookie.map_or_else(
        || (ctx.system_default(), PreferenceSource::Default),
        |v| (v, PreferenceSource::Cookie),
    );

    match store.fill(user_id, value).await {
        Ok(true) => tracing::debug!(
            kind = P::KIND,
            %user_id,
            %value,
            ?source,
            "Persisted resolved preference"
        ),
        Ok(false) => tracing::debug!(
            kind = P::KIND,
            %user_id,
            "Stored preference already set, left unchanged"
        ),
        Err(e) => tracing::warn!(
            kind = P::KIND,
            %user_id,
            error = %e,
            "Failed to persist resolved preference"
        ),
    }

    Resolution {
        value,
        source,
        write_attempted: true,
    }
}

/// Explicitly set a preference.
///
/// The cookie is always updated, so the returned jar should be sent back
/// even when the store write fails.
///
/// # Errors
///
/// Returns the store error when a signed-in user's value could not be written.
pub async fn save<P, S>(
    store: &S,
    jar: CookieJar,
    user_id: Option<UserId>,
    value: P,
) -> (CookieJar, Result<(), RepositoryError>)
where
    P: Preference,
    S: PreferenceStore<P>,
{
    let jar = jar.add(preference_cookie(value));

    let result = match user_id {
        Some(user_id) => store.store(user_id, value).await,
        None => Ok(()),
    };

    (jar, result)
}

/// Stored value for `user_id`, treating failures and unknown values as absent.
async fn read_stored<P, S>(store: &S, user_id: UserId) -> Option<P>
where
    P: Preference,
    S: PreferenceStore<P>,
{
    match store.load(user_id).await {
        Ok(Some(raw)) => {
            let value = P::parse(&raw);
            if value.is_none() {
                tracing::debug!(kind = P::KIND, %user_id, raw = %raw, "Ignoring unsupported stored value");
            }
            value
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(kind = P::KIND, %user_id, error = %e, "Failed to read stored preference");
            None
        }
    }
}

/// The value carried by the preference cookie, if it is a supported one.
#[must_use]
pub fn read_cookie<P: Preference>(jar: &CookieJar) -> Option<P> {
    jar.get(P::COOKIE_NAME).and_then(|c| P::parse(c.value()))
}

/// Build the cookie that carries `value` to the browser.
///
/// Readable from scripts so the client can apply the theme before hydration.
#[must_use]
pub fn preference_cookie<P: Preference>(value: P) -> Cookie<'static> {
    Cookie::build((P::COOKIE_NAME, value.as_str()))
        .path("/")
        .max_age(COOKIE_MAX_AGE)
        .same_site(SameSite::Lax)
        .http_only(false)
        .build()
}

/// Add the preference cookie to `jar` unless it already carries `value`.
#[must_use]
pub fn sync_cookie<P: Preference>(jar: CookieJar, value: P) -> CookieJar {
    if read_cookie::<P>(&jar) == Some(value) {
        jar
    } else {
        jar.add(preference_cookie(value))
    }
}
