use rusqlite::{Connection, params_from_iter};
use rust_decimal::Decimal;
use serde::Serialize;
use time::UtcOffset;

use crate::{
    Error,
    account::{balance_expression, get_account},
    database_id::AccountId,
    ledger::BalanceMode,
    money::{from_cents, round_money},
    transaction::TransactionFilter,
    user::UserID,
    window::{DateTimeRange, month_range},
};

/// The net change in money over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBalance {
    /// The calendar year.
    pub year: i32,
    /// The month of the year, 1-12.
    pub month: u8,
    /// The account the balance is for, or `None` for every account.
    pub account_id: Option<AccountId>,
    /// The instants the month spans in the local timezone.
    pub period: DateTimeRange,
    /// Income minus expenses in the month.
    pub balance: Decimal,
}

/// Income and expense totals in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct TypeTotals {
    pub(super) income: i64,
    pub(super) expense: i64,
}

impl TypeTotals {
    pub(super) fn net(&self) -> i64 {
        self.income - self.expense
    }
}

/// Sum the incomes and the expenses of the transactions matching `filter`.
pub(super) fn sum_by_type(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<TypeTotals, Error> {
    let (where_clause, params) = filter.to_where_clause("t")?;

    connection
        .prepare(&format!(
            "SELECT
                COALESCE(SUM(CASE WHEN t.type = 'INCOME' THEN t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.type = 'EXPENSE' THEN t.amount ELSE 0 END), 0)
             FROM \"transaction\" t WHERE {where_clause}"
        ))?
        .query_row(params_from_iter(params.iter()), |row| {
            Ok(TypeTotals {
                income: row.get(0)?,
                expense: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

/// Get the balance of an account by summing its ledger: incomes add and
/// expenses subtract, rounded to cents.
///
/// The sum is computed fresh on every call regardless of [BalanceMode], so
/// it is also the reference a stored balance must agree with.
///
/// # Errors
/// Returns [Error::AccountNotFound] if there is no account with `account_id`.
pub fn get_account_balance(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let balance = balance_expression(BalanceMode::Derived, "account");

    let cents: i64 = connection
        .prepare(&format!("SELECT {balance} FROM account WHERE id = ?1"))?
        .query_row([account_id], |row| row.get(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::AccountNotFound,
            error => error.into(),
        })?;

    Ok(round_money(from_cents(cents)))
}

/// Get income minus expenses for the calendar month `month` of `year` in
/// the timezone given by `local_offset`, optionally for a single account.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidDate] if `month` is not in 1..=12,
/// - [Error::AccountNotFound] if `account_id` does not refer to an account owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_monthly_balance(
    user_id: UserID,
    year: i32,
    month: u8,
    account_id: Option<AccountId>,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<MonthlyBalance, Error> {
    let period = month_range(year, month, local_offset)?;

    if let Some(account_id) = account_id {
        get_account(account_id, user_id, BalanceMode::Stored, connection)?;
    }

    let filter = TransactionFilter {
        account_id,
        start_date: Some(period.start),
        end_date: Some(period.end),
        ..TransactionFilter::for_user(user_id)
    };
    let totals = sum_by_type(&filter, connection)?;

    tracing::debug!("monthly balance for user {user_id} in {year}-{month:02}: {totals:?}");

    Ok(MonthlyBalance {
        year,
        month,
        account_id,
        period,
        balance: from_cents(totals.net()),
    })
}
