use rusqlite::Connection;

use crate::{
    Error,
    account::{apply_balance_delta, balance_expression, get_account},
    category::get_category,
    database_id::TransactionId,
    transaction::{
        NewTransaction, Transaction, TransactionUpdate, delete_transaction_row, get_transaction,
        insert_transaction_row, update_transaction_row,
    },
    user::UserID,
};

use super::BalanceMode;

/// Record a new transaction for `user_id`.
///
/// The category must belong to the user and have the same type as the
/// transaction, and the account must belong to the user. In
/// [BalanceMode::Stored] the account balance is adjusted by the signed amount
/// in the same unit of work as the insert.
///
/// # Errors
/// This function will return a:
/// - [Error::CategoryNotFound] if the category does not exist or belongs to another user,
/// - [Error::TypeMismatch] if the transaction and category types differ,
/// - [Error::AccountNotFound] if the account does not exist or belongs to another user,
/// - or [Error::SqlError] if a write fails, in which case nothing is written.
pub fn insert_transaction(
    new_transaction: &NewTransaction,
    user_id: UserID,
    mode: BalanceMode,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let category = get_category(new_transaction.category_id, user_id, &sql_transaction)?;
    if category.category_type != new_transaction.transaction_type {
        return Err(Error::TypeMismatch {
            transaction_type: new_transaction.transaction_type,
            category_type: category.category_type,
        });
    }

    get_account(
        new_transaction.account_id,
        user_id,
        BalanceMode::Stored,
        &sql_transaction,
    )?;

    let transaction = insert_transaction_row(new_transaction, user_id, &sql_transaction)?;

    if mode == BalanceMode::Stored {
        apply_balance_delta(
            transaction.account_id,
            user_id,
            transaction.signed_cents(),
            &sql_transaction,
        )?;
    }

    sql_transaction.commit()?;

    tracing::info!(
        "recorded {} transaction {} of {} in account {} ({mode} balance)",
        transaction.transaction_type,
        transaction.id,
        transaction.amount,
        transaction.account_id
    );

    Ok(transaction)
}

/// Change the amount, description and date of a transaction.
///
/// In [BalanceMode::Stored] the difference between the new and old amounts
/// is applied to the account balance in the same unit of work.
///
/// # Errors
/// Returns [Error::UpdateMissingTransaction] if no transaction with `id` is
/// owned by `user_id`, or [Error::SqlError] if a write fails, in which case
/// nothing is written.
pub fn update_transaction(
    id: TransactionId,
    update: &TransactionUpdate,
    user_id: UserID,
    mode: BalanceMode,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let existing = get_transaction(id, user_id, &sql_transaction).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingTransaction,
        error => error,
    })?;

    let updated = update_transaction_row(id, user_id, update, &sql_transaction)?;

    let delta_cents = updated.signed_cents() - existing.signed_cents();
    if mode == BalanceMode::Stored && delta_cents != 0 {
        apply_balance_delta(updated.account_id, user_id, delta_cents, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    tracing::info!(
        "updated transaction {id}, amount {} -> {} ({mode} balance)",
        existing.amount,
        updated.amount
    );

    Ok(updated)
}

/// Delete a transaction and return it.
///
/// In [BalanceMode::Stored] the transaction's contribution is reversed in the
/// same unit of work as the delete.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if no transaction with `id` is
/// owned by `user_id`, or [Error::SqlError] if a write fails, in which case
/// nothing is written.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    mode: BalanceMode,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let deleted = delete_transaction_row(id, user_id, &sql_transaction)?;

    if mode == BalanceMode::Stored {
        apply_balance_delta(
            deleted.account_id,
            user_id,
            -deleted.signed_cents(),
            &sql_transaction,
        )?;
    }

    sql_transaction.commit()?;

    tracing::info!("deleted transaction {id} ({mode} balance)");

    Ok(deleted)
}

/// Recompute every stored account balance from the ledger.
///
/// Needed when a database that was used with [BalanceMode::Derived] is
/// opened with [BalanceMode::Stored].
///
/// Returns the number of accounts updated.
pub fn rebuild_stored_balances(connection: &Connection) -> Result<usize, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let derived_balance = balance_expression(BalanceMode::Derived, "account");
    let rows_affected =
        sql_transaction.execute(&format!("UPDATE account SET balance = {derived_balance}"), [])?;

    sql_transaction.commit()?;

    tracing::info!("rebuilt the stored balance of {rows_affected} accounts");

    Ok(rows_affected)
}
