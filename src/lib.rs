//! Budgetly is a personal finance tracker for accounts, categories and
//! transactions.
//!
//! This library owns the ledger: the rules that keep account balances
//! consistent with the transactions recorded against them, and the queries
//! that summarise a user's finances. Balances can either be derived from the
//! ledger on every read or kept as a stored running total, see
//! [BalanceMode].

#![warn(missing_docs)]

use rust_decimal::Decimal;

mod account;
mod category;
mod config;
mod database_id;
mod db;
mod ledger;
mod money;
mod pagination;
mod summary;
#[cfg(test)]
mod test_utils;
mod timezone;
mod transaction;
mod user;
mod window;

pub use account::{
    Account, AccountName, AccountPage, AccountType, create_account, get_account, list_accounts,
};
pub use category::{Category, CategoryName, create_category, get_category, list_categories};
pub use config::{DEFAULT_TIMEZONE, LedgerConfig};
pub use database_id::{AccountId, CategoryId, TransactionId};
pub use db::initialize as initialize_db;
pub use ledger::{
    BalanceMode, delete_transaction, insert_transaction, rebuild_stored_balances,
    update_transaction,
};
pub use money::{Amount, round_money};
pub use pagination::{PageMeta, PageRequest, PaginationConfig};
pub use summary::{
    AccountOverview, CategoryOverview, CategorySummary, CategorySummaryPage, CategoryTotal,
    FinancialOverview, FinancialSummary, MonthlyBalance, get_account_balance,
    get_balance_by_category, get_category_summary, get_financial_summary, get_monthly_balance,
    list_financial_overview,
};
pub use timezone::get_local_offset;
pub use transaction::{
    NewTransaction, RecentTransaction, RecentTransactionPage, SortField, SortOrder, Transaction,
    TransactionFilter, TransactionPage, TransactionSort, TransactionType, TransactionUpdate,
    count_transactions, get_transaction, list_recent_transactions, list_transactions,
};
pub use user::{User, UserID, count_users, create_user, get_user_by_id};
pub use window::DateTimeRange;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The account does not exist or belongs to another user.
    #[error("account not found")]
    AccountNotFound,

    /// The category does not exist or belongs to another user.
    #[error("category not found")]
    CategoryNotFound,

    /// The type of a transaction did not match the type of its category.
    ///
    /// An income can only be recorded against an income category and an
    /// expense against an expense category.
    #[error(
        "the transaction type ({transaction_type}) differs from the category type ({category_type})"
    )]
    TypeMismatch {
        /// The type requested for the new transaction.
        transaction_type: TransactionType,
        /// The type of the category the transaction referenced.
        category_type: TransactionType,
    },

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to adjust the balance of an account that does not exist
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// An empty string was used to name an account or category.
    #[error("name cannot be empty")]
    EmptyName,

    /// A transaction amount was zero or negative after rounding to cents.
    ///
    /// Whether money comes in or goes out is given by the transaction type,
    /// so amounts are always positive.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(Decimal),

    /// A date or date range could not be represented, e.g. month 13.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// A string did not name a known account or transaction type.
    #[error("\"{0}\" is not a known type")]
    UnknownType(String),

    /// The email address is malformed.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user's email already exists in the database.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl Error {
    /// Whether the error was caused by the caller's request rather than by the
    /// server, i.e. the equivalent of a 4xx HTTP status.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::SqlError(_) | Error::JSONSerializationError(_) | Error::InvalidTimezoneError(_)
        )
    }

    /// The message to show the caller.
    ///
    /// Client errors carry enough detail to fix the request. Internal errors
    /// are logged and replaced with a generic message so that store internals
    /// are never shown to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidTimezoneError(timezone) => format!(
                "Could not get local timezone \"{timezone}\". Check your settings and ensure the \
                timezone has been set to a valid, canonical timezone string"
            ),
            error if error.is_client_error() => capitalise_first_char(&error.to_string()),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
        }
    }
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}

#[cfg(test)]
mod error_tests {
    use crate::{Error, TransactionType};

    #[test]
    fn type_mismatch_is_client_error_with_detail() {
        let error = Error::TypeMismatch {
            transaction_type: TransactionType::Expense,
            category_type: TransactionType::Income,
        };

        assert!(error.is_client_error());
        assert_eq!(
            error.public_message(),
            "The transaction type (EXPENSE) differs from the category type (INCOME)"
        );
    }

    #[test]
    fn sql_errors_are_not_leaked() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert!(!error.is_client_error());
        assert!(!error.public_message().contains("SQL"));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
