//! Handles log-out requests.

use axum::extract::State;
use axum_extra::extract::PrivateCookieJar;

use crate::{
    Envelope, Error,
    auth::{
        AuthState,
        cookie::{get_session_token, invalidate_session_cookie},
        session::delete_session,
    },
};

/// Invalidate the session and the session cookie.
///
/// Logging out without a session, or with one that already ended, still succeeds.
pub async fn get_log_out(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Envelope), Error> {
    if let Some(token) = get_session_token(&jar) {
        delete_session(&token, &*state.connection()?)?;
        tracing::info!("Ended session on log out");
    }

    let jar = invalidate_session_cookie(jar, state.secure_cookies);

    Ok((jar, Envelope::success("User logged out successfully")))
}
