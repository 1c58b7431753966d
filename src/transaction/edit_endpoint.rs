//! Defines the endpoints for editing expenses and income.

use axum::extract::{Extension, Path, State};
use rusqlite::{Connection, params};
use serde::Deserialize;

use crate::{
    Envelope, Error,
    auth::UserID,
    database_id::TransactionId,
    envelope::ApiJson,
    transaction::{
        AmountInput, Transaction, TransactionFields, TransactionKind, TransactionState,
        get_owned_transaction, map_transaction_row,
    },
};

/// The request body for editing a transaction.
///
/// The owner and the date of a transaction cannot be changed.
#[derive(Debug, Clone, Deserialize)]
pub struct EditTransactionRequest {
    /// The new title.
    pub title: String,
    /// The new amount.
    pub amount: AmountInput,
    /// The new category, from the vocabulary of the transaction kind.
    pub category: String,
}

/// Overwrite the title, amount and category of the transaction `id` of `kind`.
///
/// # Errors
///
/// Returns a:
/// - validation error if `request` is invalid,
/// - [Error::NotFound] if `id` does not refer to a transaction of `kind`,
/// - [Error::Forbidden] if the transaction is not owned by `owner_id`,
/// - or [Error::SqlError] if some other SQL error occurred.
pub fn edit_transaction(
    kind: TransactionKind,
    id: TransactionId,
    owner_id: UserID,
    request: EditTransactionRequest,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = request.amount.parse()?;
    let fields = TransactionFields::new(kind, &request.title, amount, &request.category)?;

    get_owned_transaction(kind, id, owner_id, connection)?;

    let transaction = connection
        .prepare(
            "UPDATE \"transaction\"
             SET title = ?1, amount = ?2, category = ?3
             WHERE id = ?4 AND kind = ?5 AND owner_id = ?6
             RETURNING id, kind, title, amount, category, date, owner_id",
        )?
        .query_row(
            params![
                fields.title,
                fields.amount,
                fields.category,
                id,
                kind,
                owner_id.as_i64()
            ],
            map_transaction_row,
        )?;

    tracing::info!("User {owner_id} updated {kind} {id}");

    Ok(transaction)
}

fn edit_transaction_endpoint(
    kind: TransactionKind,
    state: TransactionState,
    user_id: UserID,
    id: TransactionId,
    request: EditTransactionRequest,
) -> Result<Envelope, Error> {
    let transaction = edit_transaction(kind, id, user_id, request, &*state.connection()?)?;

    Envelope::success(&format!("{} updated successfully", kind.label()))
        .with(kind.as_str(), transaction)
}

/// A route handler for editing one of the logged in user's expenses.
pub async fn edit_expense_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<TransactionId>,
    ApiJson(request): ApiJson<EditTransactionRequest>,
) -> Result<Envelope, Error> {
    edit_transaction_endpoint(TransactionKind::Expense, state, user_id, expense_id, request)
}

/// A route handler for editing one of the logged in user's income.
pub async fn edit_income_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<TransactionId>,
    ApiJson(request): ApiJson<EditTransactionRequest>,
) -> Result<Envelope, Error> {
    edit_transaction_endpoint(TransactionKind::Income, state, user_id, income_id, request)
}
