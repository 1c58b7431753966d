//! Resolves the session cookie to the logged in user.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Envelope, Error,
    auth::{
        AuthState, User, UserID,
        cookie::{get_session_token, set_session_cookie},
        middleware::{refresh_session, reject_session},
        session::{SessionToken, get_session},
        user::get_user_by_id,
    },
    transaction::{Transaction, get_user_transactions},
};

/// Get the user that owns the live session for `token`.
///
/// # Errors
///
/// Returns an [Error::Unauthenticated] if there is no live session for
/// `token`, or if the session refers to a user that no longer exists.
pub fn current_user(token: &SessionToken, connection: &Connection) -> Result<User, Error> {
    let session = get_session(token, connection)?;

    match get_user_by_id(session.user_id, connection) {
        Err(Error::NotFound) => {
            tracing::warn!("Session refers to missing user {}", session.user_id);
            Err(Error::Unauthenticated)
        }
        result => result,
    }
}

/// The logged in user as sent to the client.
///
/// Does not include the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    /// The user's ID.
    pub id: UserID,
    /// The user's name.
    pub username: String,
    /// The user's email address.
    pub email: String,
    /// Every expense owned by the user, newest first.
    pub expenses: Vec<Transaction>,
    /// Every income owned by the user, newest first.
    pub income: Vec<Transaction>,
}

fn get_user_profile(user_id: UserID, connection: &Connection) -> Result<UserProfile, Error> {
    let user = get_user_by_id(user_id, connection)?;
    let transactions = get_user_transactions(user_id, connection)?;

    Ok(UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        expenses: transactions.expenses,
        income: transactions.income,
    })
}

/// A route handler that reports whether the client is logged in.
///
/// A live session is extended and the response carries the user's profile,
/// including their expenses and income.
pub async fn get_is_authenticated(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Response {
    let Some(token) = get_session_token(&jar) else {
        return reject_session(jar, false, state.secure_cookies);
    };

    let result = state.connection().and_then(|connection| {
        let (user_id, expires_at) = refresh_session(&token, state.session_duration, &connection)?;
        let profile = get_user_profile(user_id, &connection)?;

        Ok((profile, expires_at))
    });

    let (profile, expires_at) = match result {
        Ok(result) => result,
        Err(Error::Unauthenticated) => return reject_session(jar, true, state.secure_cookies),
        Err(error) => return error.into_response(),
    };

    let jar = set_session_cookie(jar, &token, expires_at, state.secure_cookies);

    match Envelope::success("User is Signed In").with("user", profile) {
        Ok(envelope) => (jar, envelope).into_response(),
        Err(error) => error.into_response(),
    }
}
