//! Creates the database schema.

use rusqlite::{
    Connection, Transaction as SqlTransaction, TransactionBehavior, functions::FunctionFlags,
};

use crate::{
    Error, account::create_account_table, category::create_category_table,
    ledger::create_balance_mode_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the tables for the domain models if they do not exist yet.
///
/// Foreign keys are switched on for `connection`, SQLite leaves them off by
/// default. The `casefold` SQL function used by description search is
/// registered on `connection`.
///
/// # Errors
/// Returns an error if a table cannot be created or there is some other SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    register_casefold(connection)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_balance_mode_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Register `casefold(text)`, which lower-cases text with Unicode rules.
///
/// SQLite's `LIKE` only ignores the case of ASCII letters. NULL stays NULL.
fn register_casefold(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text: Option<String> = context.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
}
