//! Handles log-in requests.

use axum::extract::State;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use crate::{
    Envelope, Error,
    auth::{
        AuthState, User,
        cookie::{get_session_token, set_session_cookie},
        session::{create_session, delete_session},
        user::get_user_by_username,
    },
    envelope::ApiJson,
};

/// The raw credentials sent by the client.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password hash in the database.
#[derive(Clone, Deserialize)]
pub struct LogInData {
    /// The username entered during log-in.
    pub username: String,
    /// The password entered during log-in.
    pub password: String,
}

/// Check `password` against the stored hash of `user`.
///
/// A hash that cannot be parsed is treated as a wrong password.
fn verify_password(user: &User, password: &str) -> bool {
    match user.password_hash.verify(password) {
        Ok(is_password_valid) => is_password_valid,
        Err(error) => {
            tracing::error!("Could not verify password for user {}: {error}", user.id);
            false
        }
    }
}

/// Hash `password` and throw the result away.
///
/// A failed log-in for an unknown username takes as long as one for a known
/// username with the wrong password.
fn hash_unknown_user_password(password: &str, cost: u32) {
    if let Err(error) = bcrypt::hash(password, cost) {
        tracing::error!("Could not hash password of unknown user: {error}");
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request a new session is created and the session
/// cookie is set. A session the client already held is ended first.
///
/// # Errors
///
/// Returns an [Error::InvalidCredentials] if the username is unknown or the
/// password is wrong, or an internal error if the database failed.
pub async fn post_log_in(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    ApiJson(user_data): ApiJson<LogInData>,
) -> Result<(PrivateCookieJar, Envelope), Error> {
    let lookup = get_user_by_username(user_data.username.trim(), &*state.connection()?);
    let user = match lookup {
        Ok(user) => user,
        Err(Error::NotFound) => {
            hash_unknown_user_password(&user_data.password, state.password_cost);
            return Err(Error::InvalidCredentials);
        }
        Err(error) => return Err(error),
    };

    if !verify_password(&user, &user_data.password) {
        tracing::info!("Failed log-in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let connection = state.connection()?;
    if let Some(old_token) = get_session_token(&jar) {
        delete_session(&old_token, &connection)?;
    }
    let session = create_session(user.id, state.session_duration, &connection)?;
    drop(connection);

    tracing::info!("User {} logged in", user.id);

    let jar = set_session_cookie(jar, &session.token, session.expires_at, state.secure_cookies);

    Ok((jar, Envelope::success("Login success")))
}

#[cfg(test)]
mod log_in_tests {
    use std::time::Instant;

    use axum_extra::extract::cookie::Cookie;
    use serde_json::json;

    use crate::{
        auth::COOKIE_SESSION,
        endpoints,
        test_utils::{
            TEST_PASSWORD, assert_error, assert_success, get_test_server,
            get_test_server_with_state, get_test_state, register_test_user,
        },
    };

    /// High enough that hashing dominates the request time.
    const SLOW_PASSWORD_COST: u32 = 8;

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let server = get_test_server();
        register_test_user(&server, "alice").await;

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "alice", "password": TEST_PASSWORD}))
            .await;

        let body = assert_success(&response);
        assert_eq!(body["message"], "Login success");
        let cookie = response.cookie(COOKIE_SESSION);

        let body = assert_success(
            &server
                .get(endpoints::IS_AUTHENTICATED)
                .add_cookie(cookie)
                .await,
        );
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_get_the_same_error() {
        let server = get_test_server();
        register_test_user(&server, "alice").await;

        let wrong_password = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "alice", "password": "wrong"}))
            .await;
        let unknown_user = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "mallory", "password": TEST_PASSWORD}))
            .await;

        assert_error(&wrong_password, "Incorrect username or password.");
        assert_error(&unknown_user, "Incorrect username or password.");
        assert!(wrong_password.maybe_cookie(COOKIE_SESSION).is_none());
    }

    #[tokio::test]
    async fn unknown_user_takes_as_long_as_wrong_password() {
        let state = get_test_state().password_cost(SLOW_PASSWORD_COST);
        let server = get_test_server_with_state(state);
        register_test_user(&server, "alice").await;

        let start = Instant::now();
        let wrong_password = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "alice", "password": "wrong"}))
            .await;
        let wrong_password_time = start.elapsed();

        let start = Instant::now();
        let unknown_user = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "mallory", "password": "wrong"}))
            .await;
        let unknown_user_time = start.elapsed();

        assert_error(&wrong_password, "Incorrect username or password.");
        assert_error(&unknown_user, "Incorrect username or password.");
        assert!(
            unknown_user_time * 4 >= wrong_password_time,
            "unknown user took {unknown_user_time:?}, wrong password took {wrong_password_time:?}"
        );
    }

    #[tokio::test]
    async fn log_in_ends_previous_session() {
        let server = get_test_server();
        let old_cookie: Cookie<'static> = register_test_user(&server, "alice").await;

        let response = server
            .post(endpoints::LOG_IN)
            .add_cookie(old_cookie.clone())
            .json(&json!({"username": "alice", "password": TEST_PASSWORD}))
            .await;
        assert_success(&response);

        let response = server
            .get(endpoints::IS_AUTHENTICATED)
            .add_cookie(old_cookie)
            .await;
        assert_error(&response, "Unauthorized access");
    }
}
