//! Anti-forgery token lookup.
//!
//! The backend sets a `csrftoken` cookie at login and expects its value
//! echoed back in an `X-CSRFTOKEN` header on the refresh exchange. The
//! cookie jar is shared with the HTTP client, so the value here is whatever
//! the backend last set.

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

/// Name of the cookie carrying the anti-forgery token.
pub(crate) const CSRF_COOKIE: &str = "csrftoken";

/// Read the anti-forgery token from the cookie jar for the given base URL.
///
/// Returns `None` when the backend has not set the cookie (e.g. a restored
/// session that never went through login in this process).
pub(crate) fn csrf_token(jar: &Jar, base: &Url) -> Option<String> {
    let header = jar.cookies(base)?;
    let raw = header.to_str().ok()?;

    raw.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == CSRF_COOKIE).then(|| value.to_string())
    })
}
