//! Expense and income tracking.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the category vocabulary of each kind
//! - Database functions for storing, querying, and counting transactions
//! - The JSON endpoints for adding, editing, and deleting transactions

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod kind;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, Error};

pub use core::{
    Transaction, TransactionFields, UserTransactions, count_transactions,
    create_transaction_table, get_owned_transaction, get_transaction, get_user_transactions,
    insert_transaction, list_transactions, map_transaction_row,
};
pub use create_endpoint::{
    AmountInput, NewTransactionRequest, add_expense_endpoint, add_income_endpoint, add_transaction,
};
pub use delete_endpoint::{delete_expense_endpoint, delete_income_endpoint, delete_transaction};
pub use edit_endpoint::{
    EditTransactionRequest, edit_expense_endpoint, edit_income_endpoint, edit_transaction,
};
pub use kind::{Category, TransactionKind};

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl TransactionState {
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

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
