//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row, params, types::Type};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    transaction::{Category, TransactionKind},
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Whether money was spent or earned.
    pub kind: TransactionKind,
    /// A short description of what the transaction was for.
    pub title: String,
    /// The amount of money spent or earned, never negative.
    pub amount: f64,
    /// The category from the vocabulary of `kind`.
    pub category: Category,
    /// When the transaction happened, in UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// The user that owns the transaction.
    pub owner_id: UserID,
}

/// The user-editable fields of a transaction after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFields {
    /// The trimmed, non-empty title.
    pub title: String,
    /// A finite amount that is zero or greater.
    pub amount: f64,
    /// A category from the vocabulary of the transaction's kind.
    pub category: Category,
}

impl TransactionFields {
    /// Validate the fields of a transaction of `kind`.
    ///
    /// # Errors
    ///
    /// Returns a:
    /// - [Error::EmptyTitle] if `title` is empty or only whitespace,
    /// - [Error::InvalidAmount] if `amount` is negative, NaN or infinite,
    /// - or [Error::InvalidCategory] if `category` is not in the vocabulary of `kind`.
    pub fn new(
        kind: TransactionKind,
        title: &str,
        amount: f64,
        category: &str,
    ) -> Result<Self, Error> {
        let title = title.trim();

        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }

        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmount(amount));
        }

        let category = Category::parse(kind, category)?;

        Ok(Self {
            title: title.to_owned(),
            // Normalise negative zero.
            amount: amount + 0.0,
            category,
        })
    }
}

/// The expenses and income owned by a user, each sorted newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTransactions {
    /// The user's expenses.
    pub expenses: Vec<Transaction>,
    /// The user's income.
    pub income: Vec<Transaction>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL CHECK (kind IN ('expense', 'income')),
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                amount REAL NOT NULL CHECK (amount >= 0),
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                owner_id INTEGER NOT NULL,
                CHECK ({}),
                FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
            category_constraint()
        ),
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_kind ON \"transaction\"(owner_id, kind);",
        (),
    )?;

    Ok(())
}

/// The SQL condition that the category of a row is in the vocabulary of its kind.
fn category_constraint() -> String {
    [TransactionKind::Expense, TransactionKind::Income]
        .iter()
        .map(|kind| {
            let categories = kind
                .categories()
                .iter()
                .map(|category| format!("'{}'", category.as_str()))
                .collect::<Vec<_>>()
                .join(", ");

            format!("(kind = '{}' AND category IN ({categories}))", kind.as_str())
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Insert a transaction of `kind` owned by `owner_id`.
///
/// `date` is converted to UTC before it is stored.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error,
/// e.g. `owner_id` does not refer to a registered user.
pub fn insert_transaction(
    kind: TransactionKind,
    owner_id: UserID,
    fields: TransactionFields,
    date: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (kind, title, amount, category, date, owner_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, kind, title, amount, category, date, owner_id",
        )?
        .query_row(
            params![
                kind,
                fields.title,
                fields.amount,
                fields.category,
                date.to_offset(UtcOffset::UTC),
                owner_id.as_i64(),
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction of `kind` from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction of `kind`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    kind: TransactionKind,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, kind, title, amount, category, date, owner_id FROM \"transaction\"
             WHERE id = ?1 AND kind = ?2",
        )?
        .query_row(params![id, kind], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve a transaction of `kind` by `id` and check that it belongs to `owner_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction of `kind`,
/// - [Error::Forbidden] if the transaction belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_owned_transaction(
    kind: TransactionKind,
    id: TransactionId,
    owner_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(kind, id, connection)?;

    if transaction.owner_id != owner_id {
        tracing::warn!(
            "User {owner_id} tried to access {kind} {id} owned by user {}",
            transaction.owner_id
        );
        return Err(Error::Forbidden);
    }

    Ok(transaction)
}

/// Get the transactions of `kind` owned by `owner_id`, newest first.
///
/// Transactions with the same date are ordered by descending ID.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(
    owner_id: UserID,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut transactions = connection
        .prepare(
            "SELECT id, kind, title, amount, category, date, owner_id FROM \"transaction\"
             WHERE owner_id = ?1 AND kind = ?2",
        )?
        .query_map(params![owner_id.as_i64(), kind], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

    Ok(transactions)
}

/// Get both the expenses and income owned by `owner_id`, each newest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_user_transactions(
    owner_id: UserID,
    connection: &Connection,
) -> Result<UserTransactions, Error> {
    Ok(UserTransactions {
        expenses: list_transactions(owner_id, TransactionKind::Expense, connection)?,
        income: list_transactions(owner_id, TransactionKind::Income, connection)?,
    })
}

/// Get the number of transactions of `kind` owned by `owner_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(
    owner_id: UserID,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE owner_id = ?1 AND kind = ?2",
            params![owner_id.as_i64(), kind],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let kind: TransactionKind = row.get(1)?;
    let title = row.get(2)?;
    let amount = row.get(3)?;
    let category: Category = row.get(4)?;
    if !kind.categories().contains(&category) {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("\"{category}\" is not a valid {kind} category").into(),
        ));
    }
    let date = row.get(5)?;
    let owner_id = UserID::new(row.get(6)?);

    Ok(Transaction {
        id,
        kind,
        title,
        amount,
        category,
        date,
        owner_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================
