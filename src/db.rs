//! Creates the application's tables in a SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    auth::{create_session_table, create_user_table},
    transaction::create_transaction_table,
};

/// Enable foreign keys and create the tables for the domain models.
///
/// The tables are created inside a single exclusive SQL transaction, so
/// either every table exists afterwards or none were added.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_session_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
