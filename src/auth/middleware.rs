//! Authentication middleware that validates the session cookie and extends sessions.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::{
        UserID,
        cookie::{get_session_token, invalidate_session_cookie, set_session_cookie},
        profile::current_user,
        session::{SessionToken, extend_session},
    },
};

/// The state needed for the auth middleware and the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How long a session stays valid after the last authenticated request.
    pub session_duration: Duration,
    /// Whether session cookies are only sent over HTTPS.
    pub secure_cookies: bool,
    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
    /// The database connection for users and sessions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AuthState {
    /// Acquire the database lock.
    ///
    /// # Errors
    /// Returns an [Error::DatabaseLockError] if the lock is poisoned.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("Could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            session_duration: state.session_duration,
            secure_cookies: state.secure_cookies,
            password_cost: state.password_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Check the session for `token` and slide its expiry forward.
///
/// Returns the user the session belongs to and the new expiry.
///
/// # Errors
///
/// Returns an [Error::Unauthenticated] if the session is unknown, expired,
/// was deleted while the request was in flight, or belongs to a missing user.
pub(crate) fn refresh_session(
    token: &SessionToken,
    duration: Duration,
    connection: &Connection,
) -> Result<(UserID, OffsetDateTime), Error> {
    let user = current_user(token, connection)?;

    match extend_session(token, duration, connection)? {
        Some(expires_at) => Ok((user.id, expires_at)),
        None => Err(Error::Unauthenticated),
    }
}

/// Respond with the unauthenticated envelope and, if the client sent a
/// session cookie, tell the client to drop it.
pub(crate) fn reject_session(jar: PrivateCookieJar, had_token: bool, secure: bool) -> Response {
    if had_token {
        (invalidate_session_cookie(jar, secure), Error::Unauthenticated).into_response()
    } else {
        Error::Unauthenticated.into_response()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The user ID is placed into the request and the request executed normally
/// if the session is valid, otherwise the unauthenticated envelope is returned.
/// Every authenticated request pushes the session expiry forward and refreshes
/// the cookie.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::<Key>::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(infallible) => match infallible {},
    };

    let Some(token) = get_session_token(&jar) else {
        return Error::Unauthenticated.into_response();
    };

    let refreshed = state
        .connection()
        .and_then(|connection| refresh_session(&token, state.session_duration, &connection));

    let (user_id, expires_at) = match refreshed {
        Ok(session) => session,
        Err(Error::Unauthenticated) => {
            tracing::debug!("Rejected request with a stale session cookie");
            return reject_session(jar, true, state.secure_cookies);
        }
        Err(error) => return error.into_response(),
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar = set_session_cookie(jar, &token, expires_at, state.secure_cookies);
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}
