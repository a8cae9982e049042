//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, CategoryId, TransactionId},
    money::Amount,
    user::{UserID, now_utc_seconds, timestamp_from_sql},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money came in or went out.
///
/// Categories carry a type too, and a transaction must have the same type as
/// its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money earned, e.g. wages.
    Income,
    /// Money spent, e.g. rent.
    Expense,
}

impl TransactionType {
    /// Every transaction type, in display order.
    pub fn all() -> [TransactionType; 2] {
        [TransactionType::Income, TransactionType::Expense]
    }

    /// The name used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }

    /// A human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        }
    }

    /// The sign applied to amounts of this type when summing a ledger.
    pub fn sign(&self) -> i64 {
        match self {
            TransactionType::Income => 1,
            TransactionType::Expense => -1,
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            _ => Err(Error::UnknownType(s.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned in this transaction.
    pub amount: Amount,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        account_id: AccountId,
        category_id: CategoryId,
        amount: Amount,
        transaction_type: TransactionType,
        date: OffsetDateTime,
    ) -> NewTransaction {
        NewTransaction {
            account_id,
            category_id,
            amount,
            transaction_type,
            date,
            description: None,
        }
    }

    /// The signed contribution of this transaction to its account balance, in cents.
    pub(crate) fn signed_cents(&self) -> i64 {
        self.transaction_type.sign() * self.amount.cents()
    }
}

/// A builder for a transaction that has not been recorded yet.
///
/// Account, category and type are fixed once the transaction is recorded,
/// only the fields in [TransactionUpdate] can change afterwards.
#[derive(Debug, PartialEq, Clone)]
pub struct NewTransaction {
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// The category of the transaction, e.g. "Salary", "Rent".
    ///
    /// The category's type must match `transaction_type`.
    pub category_id: CategoryId,
    /// The amount of money, always positive.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    pub transaction_type: TransactionType,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// An optional text description.
    pub description: Option<String>,
}

impl NewTransaction {
    /// Set the description for the transaction.
    ///
    /// Blank descriptions are stored as no description.
    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = normalise_description(description);
        self
    }
}

/// The fields of a recorded transaction that may be changed.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionUpdate {
    /// The new amount.
    pub amount: Amount,
    /// The new description.
    pub description: Option<String>,
    /// The new date.
    pub date: OffsetDateTime,
}

impl TransactionUpdate {
    /// Create an update, normalising blank descriptions to no description.
    pub fn new(amount: Amount, description: Option<&str>, date: OffsetDateTime) -> Self {
        Self {
            amount,
            description: normalise_description(description),
            date,
        }
    }
}

fn normalise_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map(str::to_owned)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str =
    "id, amount, description, date, type, user_id, account_id, category_id, created_at";

/// Insert a transaction row.
///
/// This does not check ownership or category type and does not touch
/// account balances; callers go through [crate::insert_transaction].
pub(crate) fn insert_transaction_row(
    new_transaction: &NewTransaction,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" \
             (amount, description, date, type, user_id, account_id, category_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                new_transaction.amount.cents(),
                &new_transaction.description,
                new_transaction.date.unix_timestamp(),
                new_transaction.transaction_type,
                user_id.as_i64(),
                new_transaction.account_id,
                new_transaction.category_id,
                now_utc_seconds().unix_timestamp(),
            ),
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a transaction owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_one((id, user_id.as_i64()), map_transaction_row)?;

    Ok(transaction)
}

/// Overwrite the amount, description and date of a transaction.
///
/// # Errors
/// Returns [Error::UpdateMissingTransaction] if no transaction with `id` is owned by `user_id`.
pub(crate) fn update_transaction_row(
    id: TransactionId,
    user_id: UserID,
    update: &TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "UPDATE \"transaction\" SET amount = ?1, description = ?2, date = ?3 \
             WHERE id = ?4 AND user_id = ?5 \
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                update.amount.cents(),
                &update.description,
                update.date.unix_timestamp(),
                id,
                user_id.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })
}

/// Delete a transaction and return the deleted row.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if no transaction with `id` is owned by `user_id`.
pub(crate) fn delete_transaction_row(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2 \
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row((id, user_id.as_i64()), map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingTransaction,
            error => error.into(),
        })
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// Amounts are stored as positive integer cents, dates as unix timestamps.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount INTEGER NOT NULL CHECK (amount > 0),
                description TEXT,
                date INTEGER NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
                );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_transaction_account ON \"transaction\"(account_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// Expects the columns in the order of the `transaction` table.
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = Amount::from_cents_unchecked(row.get(1)?);
    let description = row.get(2)?;
    let date = timestamp_from_sql(row.get(3)?, 3)?;
    let transaction_type = row.get(4)?;
    let user_id = UserID::new(row.get(5)?);
    let account_id = row.get(6)?;
    let category_id = row.get(7)?;
    let created_at = timestamp_from_sql(row.get(8)?, 8)?;

    Ok(Transaction {
        id,
        amount,
        description,
        date,
        transaction_type,
        user_id,
        account_id,
        category_id,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
