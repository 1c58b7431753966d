//! Defines the endpoints for deleting expenses and income.

use axum::extract::{Extension, Path, State};
use rusqlite::{Connection, params};

use crate::{
    Envelope, Error,
    auth::UserID,
    database_id::TransactionId,
    transaction::{TransactionKind, TransactionState, get_owned_transaction},
};

/// Delete the transaction `id` of `kind` owned by `owner_id`.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if `id` does not refer to a transaction of `kind`,
/// - [Error::Forbidden] if the transaction is not owned by `owner_id`,
/// - or [Error::SqlError] if some other SQL error occurred.
pub fn delete_transaction(
    kind: TransactionKind,
    id: TransactionId,
    owner_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    get_owned_transaction(kind, id, owner_id, connection)?;

    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND kind = ?2 AND owner_id = ?3",
        params![id, kind, owner_id.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("User {owner_id} deleted {kind} {id}");

    Ok(())
}

fn delete_transaction_endpoint(
    kind: TransactionKind,
    state: TransactionState,
    user_id: UserID,
    id: TransactionId,
) -> Result<Envelope, Error> {
    delete_transaction(kind, id, user_id, &*state.connection()?)?;

    Ok(Envelope::success(&format!(
        "{} deleted successfully",
        kind.label()
    )))
}

/// A route handler for deleting one of the logged in user's expenses.
pub async fn delete_expense_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<TransactionId>,
) -> Result<Envelope, Error> {
    delete_transaction_endpoint(TransactionKind::Expense, state, user_id, expense_id)
}

/// A route handler for deleting one of the logged in user's income.
pub async fn delete_income_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<TransactionId>,
) -> Result<Envelope, Error> {
    delete_transaction_endpoint(TransactionKind::Income, state, user_id, income_id)
}
