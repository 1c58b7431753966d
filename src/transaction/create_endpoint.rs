//! Defines the endpoints for adding expenses and income.

use axum::extract::{Extension, State};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Envelope, Error,
    auth::UserID,
    envelope::ApiJson,
    transaction::{
        Transaction, TransactionFields, TransactionKind, TransactionState, insert_transaction,
    },
};

/// A transaction amount as sent by a client.
///
/// Browser forms submit numbers as strings, so both `12.5` and `"12.5"` are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// A JSON number.
    Number(f64),
    /// A JSON string holding a decimal number.
    Text(String),
}

impl AmountInput {
    /// Convert the input to a number.
    ///
    /// # Errors
    /// Returns an [Error::InvalidRequest] if the string is not a decimal number.
    pub fn parse(&self) -> Result<f64, Error> {
        match self {
            AmountInput::Number(amount) => Ok(*amount),
            AmountInput::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| Error::InvalidRequest(format!("\"{text}\" is not a number"))),
        }
    }
}

/// The request body for adding a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransactionRequest {
    /// A short description of the transaction.
    pub title: String,
    /// The amount of money spent or earned.
    pub amount: AmountInput,
    /// A category from the vocabulary of the transaction kind.
    pub category: String,
    /// When the transaction happened, defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

/// Validate `request` and store it as a transaction of `kind` owned by `owner_id`.
///
/// Nothing is written if validation fails.
///
/// # Errors
///
/// Returns a validation error (e.g. [Error::InvalidCategory]) for a bad
/// request, or an [Error::SqlError] if the insert failed.
pub fn add_transaction(
    kind: TransactionKind,
    owner_id: UserID,
    request: NewTransactionRequest,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = request.amount.parse()?;
    let fields = TransactionFields::new(kind, &request.title, amount, &request.category)?;
    let date = request.date.unwrap_or_else(OffsetDateTime::now_utc);

    let transaction = insert_transaction(kind, owner_id, fields, date, connection)?;
    tracing::info!("User {owner_id} added {kind} {}", transaction.id);

    Ok(transaction)
}

fn add_transaction_endpoint(
    kind: TransactionKind,
    state: TransactionState,
    user_id: UserID,
    request: NewTransactionRequest,
) -> Result<Envelope, Error> {
    let transaction = add_transaction(kind, user_id, request, &*state.connection()?)?;

    Envelope::success(&format!("{} added successfully", kind.label()))
        .with(kind.as_str(), transaction)
}

/// A route handler for adding an expense for the logged in user.
pub async fn add_expense_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(request): ApiJson<NewTransactionRequest>,
) -> Result<Envelope, Error> {
    add_transaction_endpoint(TransactionKind::Expense, state, user_id, request)
}

/// A route handler for adding an income for the logged in user.
pub async fn add_income_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    ApiJson(request): ApiJson<NewTransactionRequest>,
) -> Result<Envelope, Error> {
    add_transaction_endpoint(TransactionKind::Income, state, user_id, request)
}
