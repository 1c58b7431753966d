//! Server-side sessions that map an opaque token to a user ID.
//!
//! The session table only stores the token, the user ID and the expiry.
//! Extending a session is an `UPDATE` on an existing row, so a session that
//! was deleted by a log out can never be brought back by a request that was
//! already in flight.

use std::fmt::Display;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, auth::UserID};

/// How long a session stays valid after the last authenticated request.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::days(7);

/// The opaque value stored in the session cookie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Create a new random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a token read from a cookie.
    pub fn new_unchecked(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live session for an authenticated user.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// The token the client presents in the session cookie.
    pub token: SessionToken,
    /// The user the session was created for.
    pub user_id: UserID,
    /// When the session stops being valid.
    pub expires_at: OffsetDateTime,
}

/// Create the session table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a session for `user_id` that expires after `duration`.
///
/// Expired sessions of all users are removed first.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the session could not be inserted, e.g.
/// because `user_id` does not refer to a registered user.
pub fn create_session(
    user_id: UserID,
    duration: Duration,
    connection: &Connection,
) -> Result<Session, Error> {
    let now = OffsetDateTime::now_utc();
    delete_expired_sessions(now, connection)?;

    let session = Session {
        token: SessionToken::generate(),
        user_id,
        expires_at: now + duration,
    };

    connection.execute(
        "INSERT INTO session (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        (
            session.token.as_ref(),
            session.user_id.as_i64(),
            session.expires_at.unix_timestamp(),
        ),
    )?;

    tracing::debug!("Created session for user {user_id}");

    Ok(session)
}

/// Get the unexpired session for `token`.
///
/// # Errors
///
/// Returns an [Error::Unauthenticated] if there is no session for `token` or
/// the session has expired.
pub fn get_session(token: &SessionToken, connection: &Connection) -> Result<Session, Error> {
    let row: Option<(i64, i64)> = connection
        .prepare("SELECT user_id, expires_at FROM session WHERE token = :token")?
        .query_row(&[(":token", token.as_ref())], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    let Some((user_id, expires_at)) = row else {
        return Err(Error::Unauthenticated);
    };

    let expires_at =
        OffsetDateTime::from_unix_timestamp(expires_at).map_err(|_| Error::Unauthenticated)?;

    if expires_at <= OffsetDateTime::now_utc() {
        return Err(Error::Unauthenticated);
    }

    Ok(Session {
        token: token.clone(),
        user_id: UserID::new(user_id),
        expires_at,
    })
}

/// Push the expiry of the session for `token` to `duration` from now.
///
/// Returns the new expiry, or `None` if the session no longer exists.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn extend_session(
    token: &SessionToken,
    duration: Duration,
    connection: &Connection,
) -> Result<Option<OffsetDateTime>, Error> {
    let expires_at = OffsetDateTime::now_utc() + duration;

    let rows_affected = connection.execute(
        "UPDATE session SET expires_at = ?1 WHERE token = ?2",
        (expires_at.unix_timestamp(), token.as_ref()),
    )?;

    Ok((rows_affected > 0).then_some(expires_at))
}

/// Delete the session for `token`.
///
/// Deleting a session that does not exist is not an error.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn delete_session(token: &SessionToken, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM session WHERE token = :token",
        &[(":token", token.as_ref())],
    )?;

    Ok(())
}

fn delete_expired_sessions(now: OffsetDateTime, connection: &Connection) -> Result<usize, Error> {
    let rows_affected = connection.execute(
        "DELETE FROM session WHERE expires_at <= ?1",
        (now.unix_timestamp(),),
    )?;

    if rows_affected > 0 {
        tracing::debug!("Removed {rows_affected} expired sessions");
    }

    Ok(rows_affected)
}
