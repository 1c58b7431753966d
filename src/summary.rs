//! Totals and per-category breakdowns of a user's expenses and income.

use std::collections::HashMap;

use axum::extract::{Extension, State};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::{
    Envelope, Error,
    auth::UserID,
    transaction::{Category, TransactionKind, TransactionState},
};

/// The total and number of transactions in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category.
    pub category: Category,
    /// The sum of the amounts.
    pub total: f64,
    /// The number of transactions.
    pub count: u32,
}

/// A user's totals, balance, and category breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of all income.
    pub total_income: f64,
    /// The sum of all expenses.
    pub total_expenses: f64,
    /// Total income minus total expenses.
    pub balance: f64,
    /// Expense totals for each category that has at least one expense.
    pub expenses_by_category: Vec<CategoryTotal>,
    /// Income totals for each category that has at least one income.
    pub income_by_category: Vec<CategoryTotal>,
}

/// Sum the transactions of `kind` owned by `owner_id` for each category.
///
/// Categories are listed in the order of the kind's vocabulary and empty
/// categories are left out.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_category_totals(
    owner_id: UserID,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let mut totals: HashMap<Category, CategoryTotal> = connection
        .prepare(
            "SELECT category, SUM(amount), COUNT(id) FROM \"transaction\"
             WHERE owner_id = ?1 AND kind = ?2
             GROUP BY category",
        )?
        .query_map(params![owner_id.as_i64(), kind], |row| {
            let category: Category = row.get(0)?;

            Ok((
                category,
                CategoryTotal {
                    category,
                    total: row.get(1)?,
                    count: row.get(2)?,
                },
            ))
        })?
        .collect::<Result<_, _>>()?;

    Ok(kind
        .categories()
        .iter()
        .filter_map(|category| totals.remove(category))
        .collect())
}

/// Build the summary of the transactions owned by `owner_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn summarize(owner_id: UserID, connection: &Connection) -> Result<Summary, Error> {
    let expenses_by_category = get_category_totals(owner_id, TransactionKind::Expense, connection)?;
    let income_by_category = get_category_totals(owner_id, TransactionKind::Income, connection)?;

    let total_expenses = sum_totals(&expenses_by_category);
    let total_income = sum_totals(&income_by_category);

    Ok(Summary {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        expenses_by_category,
        income_by_category,
    })
}

fn sum_totals(totals: &[CategoryTotal]) -> f64 {
    totals.iter().map(|category_total| category_total.total).sum()
}

/// A route handler for the summary of the logged in user's transactions.
pub async fn get_summary(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Envelope, Error> {
    let summary = summarize(user_id, &*state.connection()?)?;

    Envelope::success("Summary retrieved successfully").with("summary", summary)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use serde_json::json;
    use time::OffsetDateTime;

    use crate::{
        PasswordHash,
        auth::{NewUser, UserID, create_user},
        db::initialize,
        endpoints,
        test_utils::{assert_error, assert_success, get_test_server, register_test_user},
        transaction::{Category, TransactionFields, TransactionKind, insert_transaction},
    };

    use super::{CategoryTotal, summarize};

    fn get_test_connection() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            NewUser {
                username: "alice".to_owned(),
                email: "alice@example.com".to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            &connection,
        )
        .unwrap();

        (connection, user.id)
    }

    fn insert(
        connection: &Connection,
        owner: UserID,
        kind: TransactionKind,
        amount: f64,
        category: Category,
    ) {
        insert_transaction(
            kind,
            owner,
            TransactionFields {
                title: "test".to_owned(),
                amount,
                category,
            },
            OffsetDateTime::now_utc(),
            connection,
        )
        .unwrap();
    }

    #[test]
    fn empty_summary_is_zero() {
        let (connection, owner) = get_test_connection();

        let summary = summarize(owner, &connection).unwrap();

        assert_eq!(summary.total_income, 0.0);
        assert_eq!(summary.total_expenses, 0.0);
        assert_eq!(summary.balance, 0.0);
        assert!(summary.expenses_by_category.is_empty());
        assert!(summary.income_by_category.is_empty());
    }

    #[test]
    fn summary_groups_by_category_in_vocabulary_order() {
        let (connection, owner) = get_test_connection();
        insert(&connection, owner, TransactionKind::Expense, 3.0, Category::Miscellaneous);
        insert(&connection, owner, TransactionKind::Expense, 4.0, Category::FoodGroceries);
        insert(&connection, owner, TransactionKind::Expense, 6.0, Category::FoodGroceries);
        insert(&connection, owner, TransactionKind::Expense, 500.0, Category::Housing);
        insert(&connection, owner, TransactionKind::Income, 1000.0, Category::Salary);
        insert(&connection, owner, TransactionKind::Income, 20.0, Category::Miscellaneous);

        let summary = summarize(owner, &connection).unwrap();

        assert_eq!(
            summary.expenses_by_category,
            vec![
                CategoryTotal {
                    category: Category::Housing,
                    total: 500.0,
                    count: 1
                },
                CategoryTotal {
                    category: Category::FoodGroceries,
                    total: 10.0,
                    count: 2
                },
                CategoryTotal {
                    category: Category::Miscellaneous,
                    total: 3.0,
                    count: 1
                },
            ]
        );
        assert_eq!(
            summary.income_by_category,
            vec![
                CategoryTotal {
                    category: Category::Salary,
                    total: 1000.0,
                    count: 1
                },
                CategoryTotal {
                    category: Category::Miscellaneous,
                    total: 20.0,
                    count: 1
                },
            ]
        );
        assert_eq!(summary.total_expenses, 513.0);
        assert_eq!(summary.total_income, 1020.0);
        assert_eq!(summary.balance, 507.0);
    }

    #[test]
    fn summary_ignores_other_users() {
        let (connection, alice) = get_test_connection();
        let bob = create_user(
            NewUser {
                username: "bob".to_owned(),
                email: "bob@example.com".to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            &connection,
        )
        .unwrap()
        .id;
        insert(&connection, bob, TransactionKind::Income, 99.0, Category::Salary);

        let summary = summarize(alice, &connection).unwrap();

        assert_eq!(summary.total_income, 0.0);
        assert!(summary.income_by_category.is_empty());
    }

    #[tokio::test]
    async fn summary_endpoint_returns_summary() {
        let server = get_test_server();
        let cookie = register_test_user(&server, "alice").await;
        assert_success(
            &server
                .post(endpoints::ADD_INCOME)
                .add_cookie(cookie.clone())
                .json(&json!({"title": "Pay", "amount": 100, "category": "Salary"}))
                .await,
        );
        assert_success(
            &server
                .post(endpoints::ADD_EXPENSE)
                .add_cookie(cookie.clone())
                .json(&json!({"title": "Coffee", "amount": 4, "category": "Food/Groceries"}))
                .await,
        );

        let body = assert_success(&server.get(endpoints::SUMMARY).add_cookie(cookie).await);

        assert_eq!(
            body["summary"],
            json!({
                "total_income": 100.0,
                "total_expenses": 4.0,
                "balance": 96.0,
                "expenses_by_category": [
                    {"category": "Food/Groceries", "total": 4.0, "count": 1},
                ],
                "income_by_category": [
                    {"category": "Salary", "total": 100.0, "count": 1},
                ],
            })
        );
    }

    #[tokio::test]
    async fn summary_requires_session() {
        let server = get_test_server();

        assert_error(&server.get(endpoints::SUMMARY).await, "Unauthorized access");
    }
}
