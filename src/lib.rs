//! Tally is a web API for tracking personal income and expenses.
//!
//! Users register, log in with a cookie-backed session, and record expenses
//! and income tagged with a category. Every response is a JSON envelope of
//! the form `{"error": bool, "message": string, ...}`.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod database_id;
mod db;
mod endpoints;
mod envelope;
mod logging;
mod routing;
mod summary;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, create_cookie_key};
pub use auth::{
    AuthState, DEFAULT_SESSION_DURATION, NewUser, PasswordHash, Session, SessionToken, User,
    UserID, UserProfile, ValidatedPassword, count_users, current_user,
};
pub use db::initialize as initialize_db;
pub use envelope::{ApiJson, Envelope};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use summary::{CategoryTotal, Summary, get_category_totals, summarize};
pub use transaction::{
    AmountInput, Category, EditTransactionRequest, NewTransactionRequest, Transaction,
    TransactionFields, TransactionKind, TransactionState, UserTransactions, add_transaction,
    count_transactions, delete_transaction, edit_transaction, get_owned_transaction,
    get_user_transactions, list_transactions,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
///
/// Every variant is reported to the client as an error envelope with the
/// status code 200. Variants that describe a server fault are logged and
/// replaced with a generic message, see [Error::client_message].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username was empty or only whitespace.
    #[error("Username cannot be empty.")]
    EmptyUsername,

    /// The email address is malformed or shorter than five characters.
    #[error("\"{0}\" is not a valid email address.")]
    InvalidEmail(String),

    /// The password was shorter than three or longer than one hundred characters.
    #[error("Password must be between 3 and 100 characters long.")]
    InvalidPassword,

    /// The title of a transaction was empty or only whitespace.
    #[error("Title cannot be empty.")]
    EmptyTitle,

    /// The amount of a transaction was negative, NaN or infinite.
    ///
    /// Whether money was spent or earned is recorded by the transaction kind,
    /// so amounts are never negative.
    #[error("{0} is not a valid amount, amounts must be zero or greater.")]
    InvalidAmount(f64),

    /// The category is not part of the vocabulary for the transaction kind.
    #[error("\"{category}\" is not a valid {kind} category.")]
    InvalidCategory {
        /// The kind of transaction the category was given for.
        kind: transaction::TransactionKind,
        /// The rejected category.
        category: String,
    },

    /// The request body could not be parsed, e.g. a missing field or wrong type.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The username or email address is already registered.
    #[error("User already exists")]
    DuplicateUser,

    /// The username and password pair did not match a registered user.
    ///
    /// The same error is used for an unknown username and a wrong password
    /// so that clients cannot probe for registered usernames.
    #[error("Incorrect username or password.")]
    InvalidCredentials,

    /// The request did not carry a valid, unexpired session.
    #[error("Unauthorized access")]
    Unauthenticated,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("The requested resource could not be found.")]
    NotFound,

    /// The authenticated user tried to modify a record owned by another user.
    #[error("You do not have permission to modify this record.")]
    Forbidden,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl Error {
    /// The message to show the client in the error envelope.
    pub fn client_message(&self) -> String {
        if self.is_internal() {
            "Something went wrong. Try again later or check the server logs.".to_owned()
        } else {
            self.to_string()
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::HashingError(_)
                | Error::SqlError(_)
                | Error::DatabaseLockError
                | Error::JSONSerializationError(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && (desc.ends_with("user.username") || desc.ends_with("user.email")) =>
            {
                Error::DuplicateUser
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!("An unexpected error occurred: {}", self);
        } else {
            tracing::debug!("Responding with error envelope: {}", self);
        }

        Envelope::error(&self.client_message()).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use crate::{Error, transaction::TransactionKind};

    #[test]
    fn internal_errors_are_hidden_from_client() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert!(!error.client_message().contains("SQL"));
    }

    #[test]
    fn validation_errors_are_shown_to_client() {
        let error = Error::InvalidCategory {
            kind: TransactionKind::Expense,
            category: "NotARealCategory".to_owned(),
        };

        assert_eq!(
            error.client_message(),
            "\"NotARealCategory\" is not a valid expense category."
        );
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
