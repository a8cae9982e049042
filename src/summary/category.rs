use rusqlite::{Connection, Row, params_from_iter};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    category::CategoryName,
    database_id::{AccountId, CategoryId},
    money::from_cents,
    pagination::{PageMeta, PageRequest},
    transaction::{TransactionFilter, TransactionType},
    user::UserID,
    window::{DateTimeRange, trailing_days},
};

/// A category's total over the summary window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// The category ID.
    pub id: CategoryId,
    /// The category name.
    pub name: CategoryName,
    /// Whether the category holds incomes or expenses.
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// The sum of the category's transactions in the window, negated for
    /// expense categories.
    pub total: Decimal,
}

/// A page of category totals, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummaryPage {
    /// The categories on this page.
    pub categories: Vec<CategorySummary>,
    /// The window the totals cover.
    pub window: DateTimeRange,
    /// Where the page sits in the full listing.
    pub meta: PageMeta,
}

/// The unsigned total of a category's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category ID.
    pub id: CategoryId,
    /// The category name.
    pub name: CategoryName,
    /// Whether the category holds incomes or expenses.
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// The sum of the matching transactions.
    pub total: Decimal,
}

/// Summarise every category of `user_id` over the `window_days` days up to
/// `now`.
///
/// Categories without transactions in the window are included with a zero
/// total. Expense totals are negated so that expenses read as negative and
/// incomes as positive. Categories are sorted by signed total, largest
/// first, then by name.
pub fn get_category_summary(
    user_id: UserID,
    window_days: u32,
    now: OffsetDateTime,
    page: PageRequest,
    connection: &Connection,
) -> Result<CategorySummaryPage, Error> {
    let window = trailing_days(now, window_days);

    let total: i64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let categories = connection
        .prepare(
            "SELECT c.id, c.name, c.type,
                CASE WHEN c.type = 'EXPENSE'
                    THEN -COALESCE(SUM(t.amount), 0)
                    ELSE COALESCE(SUM(t.amount), 0)
                END AS signed_total
             FROM category c
             LEFT JOIN \"transaction\" t
                ON t.category_id = c.id
                AND t.user_id = c.user_id
                AND t.date >= ?2
                AND t.date <= ?3
             WHERE c.user_id = ?1
             GROUP BY c.id, c.name, c.type
             ORDER BY signed_total DESC, c.name ASC, c.id ASC
             LIMIT ?4 OFFSET ?5",
        )?
        .query_map(
            (
                user_id.as_i64(),
                window.start.unix_timestamp(),
                window.end.unix_timestamp(),
                page.limit as i64,
                page.offset() as i64,
            ),
            |row| {
                Ok(CategorySummary {
                    id: row.get(0)?,
                    name: map_name(row)?,
                    category_type: row.get(2)?,
                    total: from_cents(row.get(3)?),
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "summarised {} of {total} categories for user {user_id} over {window_days} days",
        categories.len()
    );

    Ok(CategorySummaryPage {
        categories,
        window,
        meta: page.meta(total as u64),
    })
}

/// Total the transactions of `user_id` per category, optionally within a
/// date range and for a single account.
///
/// Totals are unsigned. Categories with no matching transactions are left out.
pub fn get_balance_by_category(
    user_id: UserID,
    start_date: Option<OffsetDateTime>,
    end_date: Option<OffsetDateTime>,
    account_id: Option<AccountId>,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let filter = TransactionFilter {
        account_id,
        start_date,
        end_date,
        ..TransactionFilter::for_user(user_id)
    };
    let (where_clause, params) = filter.to_where_clause("t")?;

    connection
        .prepare(&format!(
            "SELECT c.id, c.name, c.type, SUM(t.amount)
             FROM \"transaction\" t
             INNER JOIN category c ON c.id = t.category_id
             WHERE {where_clause}
             GROUP BY c.id, c.name, c.type
             ORDER BY c.name ASC, c.id ASC"
        ))?
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(CategoryTotal {
                id: row.get(0)?,
                name: map_name(row)?,
                category_type: row.get(2)?,
                total: from_cents(row.get(3)?),
            })
        })?
        .map(|maybe_total| maybe_total.map_err(Error::from))
        .collect()
}

fn map_name(row: &Row) -> Result<CategoryName, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    Ok(CategoryName::new_unchecked(&raw_name))
}
