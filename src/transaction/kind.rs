//! Transaction kinds and their category vocabularies.

use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Whether a transaction records money spent or money earned.
///
/// Both kinds share the same shape and storage, but each has its own set of
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
}

impl TransactionKind {
    /// The lowercase name used in storage and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    /// The capitalised name used in messages, e.g. "Expense added successfully".
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "Expense",
            TransactionKind::Income => "Income",
        }
    }

    /// The categories a transaction of this kind may use, in display order.
    pub fn categories(&self) -> &'static [Category] {
        match self {
            TransactionKind::Expense => &EXPENSE_CATEGORIES,
            TransactionKind::Income => &INCOME_CATEGORIES,
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            other => Err(FromSqlError::Other(
                format!("unknown transaction kind \"{other}\"").into(),
            )),
        }
    }
}

/// The category of a transaction, e.g. "Housing" or "Salary".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Tuition, books, courses.
    Academic,
    /// Rent, mortgage, utilities.
    Housing,
    /// Food and groceries.
    #[serde(rename = "Food/Groceries")]
    FoodGroceries,
    /// Public transport, fuel, car costs.
    Transportation,
    /// Doctor visits, medicine.
    Healthcare,
    /// Personal care.
    Personal,
    /// Going out, subscriptions, hobbies.
    Entertainment,
    /// Clothes and shoes.
    Clothing,
    /// Wages from an employer.
    Salary,
    /// Income from running a business.
    Business,
    /// Dividends, interest, capital gains.
    Investments,
    /// Rent received.
    Rentals,
    /// Benefits and insurance payouts.
    #[serde(rename = "Benefits/Insurance")]
    BenefitsInsurance,
    /// Anything else. Valid for both kinds.
    Miscellaneous,
}

const EXPENSE_CATEGORIES: [Category; 9] = [
    Category::Academic,
    Category::Housing,
    Category::FoodGroceries,
    Category::Transportation,
    Category::Healthcare,
    Category::Personal,
    Category::Entertainment,
    Category::Clothing,
    Category::Miscellaneous,
];

const INCOME_CATEGORIES: [Category; 6] = [
    Category::Salary,
    Category::Business,
    Category::Investments,
    Category::Rentals,
    Category::BenefitsInsurance,
    Category::Miscellaneous,
];

const ALL_CATEGORIES: [Category; 14] = [
    Category::Academic,
    Category::Housing,
    Category::FoodGroceries,
    Category::Transportation,
    Category::Healthcare,
    Category::Personal,
    Category::Entertainment,
    Category::Clothing,
    Category::Salary,
    Category::Business,
    Category::Investments,
    Category::Rentals,
    Category::BenefitsInsurance,
    Category::Miscellaneous,
];

impl Category {
    /// Parse `raw` as a category of `kind`.
    ///
    /// Matching is exact, e.g. "food/groceries" is rejected.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidCategory] if `raw` is not in the vocabulary of `kind`.
    pub fn parse(kind: TransactionKind, raw: &str) -> Result<Self, Error> {
        kind.categories()
            .iter()
            .find(|category| category.as_str() == raw)
            .copied()
            .ok_or_else(|| Error::InvalidCategory {
                kind,
                category: raw.to_owned(),
            })
    }

    /// The name of the category as shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Academic => "Academic",
            Category::Housing => "Housing",
            Category::FoodGroceries => "Food/Groceries",
            Category::Transportation => "Transportation",
            Category::Healthcare => "Healthcare",
            Category::Personal => "Personal",
            Category::Entertainment => "Entertainment",
            Category::Clothing => "Clothing",
            Category::Salary => "Salary",
            Category::Business => "Business",
            Category::Investments => "Investments",
            Category::Rentals => "Rentals",
            Category::BenefitsInsurance => "Benefits/Insurance",
            Category::Miscellaneous => "Miscellaneous",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;

        ALL_CATEGORIES
            .iter()
            .find(|category| category.as_str() == raw)
            .copied()
            .ok_or_else(|| FromSqlError::Other(format!("unknown category \"{raw}\"").into()))
    }
}
