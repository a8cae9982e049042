//! Database operations for accounts.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    database_id::AccountId,
    ledger::BalanceMode,
    money::from_cents,
    pagination::PageRequest,
    user::{UserID, now_utc_seconds, timestamp_from_sql},
};

use super::core::{Account, AccountName, AccountPage, AccountType};

/// The SQL expression for the balance of the account row aliased as `table`, in cents.
///
/// Stored balances read the running total on the account row. Derived
/// balances sum the account's ledger: incomes add, expenses subtract.
pub(crate) fn balance_expression(mode: BalanceMode, table: &str) -> String {
    match mode {
        BalanceMode::Stored => format!("{table}.balance"),
        BalanceMode::Derived => format!(
            "(SELECT COALESCE(SUM(CASE WHEN ledger_row.type = 'INCOME' \
             THEN ledger_row.amount ELSE -ledger_row.amount END), 0) \
             FROM \"transaction\" ledger_row WHERE ledger_row.account_id = {table}.id)"
        ),
    }
}

/// Create an account with a zero balance.
///
/// # Errors
/// Returns an [Error::SqlError] if `user_id` does not refer to a user or
/// there is some other SQL error.
pub fn create_account(
    name: AccountName,
    account_type: AccountType,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "INSERT INTO account (name, type, balance, user_id, created_at)
             VALUES (?1, ?2, 0, ?3, ?4)
             RETURNING id, name, type, balance, user_id, created_at",
        )?
        .query_row(
            (
                name.as_ref(),
                account_type,
                user_id.as_i64(),
                now_utc_seconds().unix_timestamp(),
            ),
            map_row,
        )?;

    tracing::debug!("created account {} for user {user_id}", account.id);

    Ok(account)
}

/// Retrieve an account owned by `user_id`, with its balance read under `mode`.
///
/// # Errors
/// Returns [Error::AccountNotFound] if the account does not exist or belongs
/// to another user.
pub fn get_account(
    account_id: AccountId,
    user_id: UserID,
    mode: BalanceMode,
    connection: &Connection,
) -> Result<Account, Error> {
    let balance = balance_expression(mode, "account");

    connection
        .prepare(&format!(
            "SELECT id, name, type, {balance}, user_id, created_at FROM account
             WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((account_id, user_id.as_i64()), map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::AccountNotFound,
            error => error.into(),
        })
}

/// List a page of a user's accounts ordered by name, with balances read under `mode`.
pub fn list_accounts(
    user_id: UserID,
    mode: BalanceMode,
    page: PageRequest,
    connection: &Connection,
) -> Result<AccountPage, Error> {
    let total: i64 = connection.query_row(
        "SELECT COUNT(id) FROM account WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let balance = balance_expression(mode, "account");
    let accounts = connection
        .prepare(&format!(
            "SELECT id, name, type, {balance}, user_id, created_at FROM account
             WHERE user_id = ?1 ORDER BY name ASC, id ASC LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(
            (user_id.as_i64(), page.limit as i64, page.offset() as i64),
            map_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AccountPage {
        accounts,
        meta: page.meta(total as u64),
    })
}

/// Add `delta_cents` to the stored balance of an account.
///
/// A single `UPDATE` so that concurrent units of work cannot lose each
/// other's adjustments.
///
/// # Errors
/// Returns [Error::UpdateMissingAccount] if no account with `account_id` is
/// owned by `user_id`.
pub(crate) fn apply_balance_delta(
    account_id: AccountId,
    user_id: UserID,
    delta_cents: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = balance + ?1 WHERE id = ?2 AND user_id = ?3",
        (delta_cents, account_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingAccount);
    }

    Ok(())
}

/// Create the account table.
///
/// `balance` holds the stored running total in cents and is only
/// maintained when balances are stored.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('CHECKING', 'CREDIT', 'CASH')),
            balance INTEGER NOT NULL DEFAULT 0,
            user_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let account_type = row.get(2)?;
    let balance = from_cents(row.get(3)?);
    let user_id = UserID::new(row.get(4)?);
    let created_at = timestamp_from_sql(row.get(5)?, 5)?;

    Ok(Account {
        id,
        name: AccountName::new_unchecked(&raw_name),
        account_type,
        balance,
        user_id,
        created_at,
    })
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}
