//! Defines functions for storing the session token in a private cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::auth::session::SessionToken;

/// The name of the cookie that holds the session token.
pub(crate) const COOKIE_SESSION: &str = "session";

/// Add the session cookie to the cookie jar.
///
/// The cookie is HTTP-only and same-site strict. `secure` should only be
/// false for local development over plain HTTP.
///
/// Returns the cookie jar with the cookie added.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    token: &SessionToken,
    expires_at: OffsetDateTime,
    secure: bool,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, token.as_ref().to_owned()))
            .path("/")
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar, secure: bool) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

/// Get the session token from the cookie jar, if there is one.
pub(crate) fn get_session_token(jar: &PrivateCookieJar) -> Option<SessionToken> {
    jar.get(COOKIE_SESSION)
        .map(|cookie| SessionToken::new_unchecked(cookie.value_trimmed()))
}
