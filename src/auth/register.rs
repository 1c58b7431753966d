//! Handles user registration.

use axum::extract::State;
use axum_extra::extract::PrivateCookieJar;
use email_address::EmailAddress;
use serde::Deserialize;

use crate::{
    Envelope, Error, PasswordHash, ValidatedPassword,
    auth::{
        AuthState,
        cookie::set_session_cookie,
        session::create_session,
        user::{NewUser, create_user, find_user_by_username_or_email},
    },
    envelope::ApiJson,
};

/// The shortest email address that is accepted.
const MIN_EMAIL_LENGTH: usize = 5;

/// The request body for registering a user.
///
/// Does not implement `Debug` so the raw password cannot end up in the logs.
#[derive(Clone, Deserialize)]
pub struct RegisterForm {
    /// The name the user will log in with.
    pub username: String,
    /// The user's email address.
    pub email: String,
    /// The raw password.
    pub password: String,
}

/// The validated fields of a registration.
struct Registration {
    username: String,
    email: String,
    password: ValidatedPassword,
}

fn validate_registration(form: RegisterForm) -> Result<Registration, Error> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(Error::EmptyUsername);
    }

    let email = form.email.trim();
    if email.chars().count() < MIN_EMAIL_LENGTH || !EmailAddress::is_valid(email) {
        return Err(Error::InvalidEmail(email.to_owned()));
    }

    let password = ValidatedPassword::new(&form.password)?;

    Ok(Registration {
        username: username.to_owned(),
        email: email.to_owned(),
        password,
    })
}

/// A route handler for registering a new user.
///
/// On success the user is logged in straight away and the session cookie is set.
///
/// # Errors
///
/// Returns a:
/// - validation error if the username, email or password is invalid,
/// - [Error::DuplicateUser] if the username or email is already registered,
/// - or an internal error if hashing or the database failed.
pub async fn register_user(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<(PrivateCookieJar, Envelope), Error> {
    let registration = validate_registration(form)?;

    let password_hash = PasswordHash::new(registration.password, state.password_cost)?;

    let connection = state.connection()?;

    if find_user_by_username_or_email(&registration.username, &registration.email, &connection)?
        .is_some()
    {
        return Err(Error::DuplicateUser);
    }

    let user = create_user(
        NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
        },
        &connection,
    )?;
    let session = create_session(user.id, state.session_duration, &connection)?;
    drop(connection);

    tracing::info!("Registered user {} ({})", user.username, user.id);

    let jar = set_session_cookie(jar, &session.token, session.expires_at, state.secure_cookies);

    Ok((jar, Envelope::success("Sign up success")))
}
