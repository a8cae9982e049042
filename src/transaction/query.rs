//! Filtered, sorted and paginated transaction listings.

use rusqlite::{Connection, params_from_iter, types::Value};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, CategoryId},
    money::to_cents,
    pagination::{PageMeta, PageRequest},
    user::UserID,
};

use super::core::{Transaction, TransactionType, map_transaction_row};

/// The column to sort transactions by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// When the transaction happened.
    #[default]
    Date,
    /// The transaction amount.
    Amount,
    /// When the transaction was recorded.
    CreatedAt,
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    Descending,
}

/// How to sort a transaction listing, newest first by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionSort {
    /// The column to sort by.
    pub field: SortField,
    /// The sort direction.
    pub order: SortOrder,
}

/// Criteria for selecting a user's transactions. Unset fields do not filter.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    /// The owner of the transactions.
    pub user_id: UserID,
    /// Only transactions in this account.
    pub account_id: Option<AccountId>,
    /// Only transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only incomes or only expenses.
    pub transaction_type: Option<TransactionType>,
    /// Only transactions on or after this instant.
    pub start_date: Option<OffsetDateTime>,
    /// Only transactions on or before this instant.
    pub end_date: Option<OffsetDateTime>,
    /// Only transactions with an amount of at least this much.
    pub min_amount: Option<Decimal>,
    /// Only transactions with an amount of at most this much.
    pub max_amount: Option<Decimal>,
    /// Only transactions whose description contains this text, ignoring case.
    ///
    /// Case is folded with Unicode rules, so "água" matches "Conta de Água".
    pub search: Option<String>,
}

impl TransactionFilter {
    /// A filter that matches every transaction of `user_id`.
    pub fn for_user(user_id: UserID) -> Self {
        Self {
            user_id,
            account_id: None,
            category_id: None,
            transaction_type: None,
            start_date: None,
            end_date: None,
            min_amount: None,
            max_amount: None,
            search: None,
        }
    }

    /// Build the `WHERE` clause and its positional parameters.
    ///
    /// Columns are qualified with `table` so the clause can be used in joins.
    pub(crate) fn to_where_clause(&self, table: &str) -> Result<(String, Vec<Value>), Error> {
        let mut conditions = vec![format!("{table}.user_id = ?")];
        let mut params = vec![Value::Integer(self.user_id.as_i64())];

        if let Some(account_id) = self.account_id {
            conditions.push(format!("{table}.account_id = ?"));
            params.push(Value::Integer(account_id));
        }

        if let Some(category_id) = self.category_id {
            conditions.push(format!("{table}.category_id = ?"));
            params.push(Value::Integer(category_id));
        }

        if let Some(transaction_type) = self.transaction_type {
            conditions.push(format!("{table}.type = ?"));
            params.push(Value::Text(transaction_type.as_str().to_owned()));
        }

        if let Some(start_date) = self.start_date {
            conditions.push(format!("{table}.date >= ?"));
            params.push(Value::Integer(start_date.unix_timestamp()));
        }

        if let Some(end_date) = self.end_date {
            conditions.push(format!("{table}.date <= ?"));
            params.push(Value::Integer(end_date.unix_timestamp()));
        }

        if let Some(min_amount) = self.min_amount {
            conditions.push(format!("{table}.amount >= ?"));
            params.push(Value::Integer(to_cents(min_amount)?));
        }

        if let Some(max_amount) = self.max_amount {
            conditions.push(format!("{table}.amount <= ?"));
            params.push(Value::Integer(to_cents(max_amount)?));
        }

        let search = self.search.as_deref().map(str::trim).unwrap_or_default();
        if !search.is_empty() {
            conditions.push(format!(
                "casefold({table}.description) LIKE casefold(?) ESCAPE '\\'"
            ));
            params.push(Value::Text(format!("%{}%", escape_like(search))));
        }

        Ok((conditions.join(" AND "), params))
    }
}

/// A page of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    /// The transactions on this page.
    pub transactions: Vec<Transaction>,
    /// Where the page sits in the full listing.
    pub meta: PageMeta,
}

/// A transaction with the names of its account and category, for showing
/// recent activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentTransaction {
    /// The transaction itself.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The name of the transaction's account.
    pub account_name: String,
    /// The name of the transaction's category.
    pub category_name: String,
}

/// A page of recent transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentTransactionPage {
    /// The transactions on this page, newest first.
    pub transactions: Vec<RecentTransaction>,
    /// Where the page sits in the full listing.
    pub meta: PageMeta,
}

/// List the transactions matching `filter`, sorted by `sort`.
///
/// Rows with equal sort keys are ordered by ID to keep pages stable.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or
/// [Error::InvalidAmount] if an amount bound cannot be converted to cents.
pub fn list_transactions(
    filter: &TransactionFilter,
    sort: TransactionSort,
    page: PageRequest,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    let (where_clause, mut params) = filter.to_where_clause("\"transaction\"")?;

    let total: i64 = connection
        .prepare(&format!(
            "SELECT COUNT(id) FROM \"transaction\" WHERE {where_clause}"
        ))?
        .query_row(params_from_iter(params.iter()), |row| row.get(0))?;

    let order_clause = order_clause(sort);
    params.push(Value::Integer(page.limit as i64));
    params.push(Value::Integer(page.offset() as i64));

    let transactions = connection
        .prepare(&format!(
            "SELECT id, amount, description, date, type, user_id, account_id, category_id, created_at \
             FROM \"transaction\" WHERE {where_clause} {order_clause} LIMIT ? OFFSET ?"
        ))?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "listed {} of {total} transactions for user {}",
        transactions.len(),
        filter.user_id
    );

    Ok(TransactionPage {
        transactions,
        meta: page.meta(total as u64),
    })
}

/// List a user's most recent transactions along with their account and
/// category names.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_recent_transactions(
    user_id: UserID,
    page: PageRequest,
    connection: &Connection,
) -> Result<RecentTransactionPage, Error> {
    let total: i64 = connection.query_row(
        "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let transactions = connection
        .prepare(
            "SELECT t.id, t.amount, t.description, t.date, t.type, t.user_id, t.account_id, \
             t.category_id, t.created_at, a.name, c.name \
             FROM \"transaction\" t \
             INNER JOIN account a ON a.id = t.account_id \
             INNER JOIN category c ON c.id = t.category_id \
             WHERE t.user_id = ?1 \
             ORDER BY t.date DESC, t.id DESC \
             LIMIT ?2 OFFSET ?3",
        )?
        .query_map(
            (user_id.as_i64(), page.limit as i64, page.offset() as i64),
            |row| {
                Ok(RecentTransaction {
                    transaction: map_transaction_row(row)?,
                    account_name: row.get(9)?,
                    category_name: row.get(10)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RecentTransactionPage {
        transactions,
        meta: page.meta(total as u64),
    })
}

fn order_clause(sort: TransactionSort) -> String {
    let column = match sort.field {
        SortField::Date => "date",
        SortField::Amount => "amount",
        SortField::CreatedAt => "created_at",
    };
    let direction = match sort.order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };

    format!("ORDER BY {column} {direction}, id ASC")
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::{Duration, macros::datetime};

    use crate::{
        PageRequest, TransactionType, UserID,
        test_utils::{TestLedger, get_test_connection},
    };

    use super::{
        SortField, SortOrder, TransactionFilter, TransactionSort, escape_like,
        list_recent_transactions, list_transactions,
    };

    #[test]
    fn lists_only_the_users_transactions() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        let other = TestLedger::with_email("other@email.com", &conn);
        ledger.insert_row(dec!(10), TransactionType::Income, &conn);
        other.insert_row(dec!(20), TransactionType::Income, &conn);

        let page = list_transactions(
            &TransactionFilter::for_user(ledger.user.id),
            TransactionSort::default(),
            PageRequest::new(1, 20),
            &conn,
        )
        .unwrap();

        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.transactions[0].amount.value(), dec!(10));
        assert_eq!(page.meta.total, 1);
    }

    #[test]
    fn filters_by_type_amount_and_search() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        for (amount, transaction_type, description) in [
            (dec!(5), TransactionType::Expense, "Coffee"),
            (dec!(50), TransactionType::Expense, "Groceries"),
            (dec!(500), TransactionType::Expense, "COFFEE machine"),
            (dec!(50), TransactionType::Income, "Coffee refund"),
        ] {
            ledger.insert_row_with(amount, transaction_type, description, ledger.date, &conn);
        }

        let filter = TransactionFilter {
            transaction_type: Some(TransactionType::Expense),
            min_amount: Some(dec!(5)),
            max_amount: Some(dec!(500)),
            search: Some("coffee".to_owned()),
            ..TransactionFilter::for_user(ledger.user.id)
        };
        let page =
            list_transactions(&filter, TransactionSort::default(), PageRequest::new(1, 20), &conn)
                .unwrap();

        let amounts: Vec<_> = page.transactions.iter().map(|t| t.amount.value()).collect();
        assert_eq!(amounts, vec![dec!(5), dec!(500)]);
    }

    #[test]
    fn search_ignores_case_of_accented_letters() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        for description in ["Conta de Água", "Aluguel", "ÁGUA mineral"] {
            ledger.insert_row_with(
                dec!(80),
                TransactionType::Expense,
                description,
                ledger.date,
                &conn,
            );
        }

        for search in ["água", "Água", "ÁGUA"] {
            let filter = TransactionFilter {
                search: Some(search.to_owned()),
                ..TransactionFilter::for_user(ledger.user.id)
            };
            let page = list_transactions(
                &filter,
                TransactionSort::default(),
                PageRequest::new(1, 20),
                &conn,
            )
            .unwrap();

            let descriptions: Vec<_> = page
                .transactions
                .iter()
                .filter_map(|t| t.description.as_deref())
                .collect();
            assert_eq!(
                descriptions,
                vec!["Conta de Água", "ÁGUA mineral"],
                "searching for {search:?}"
            );
        }
    }

    #[test]
    fn filters_by_inclusive_date_range() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        let start = datetime!(2025-01-10 00:00:00 UTC);
        for day in 0..5 {
            ledger.insert_row_with(
                dec!(1),
                TransactionType::Income,
                "",
                start + Duration::days(day),
                &conn,
            );
        }

        let filter = TransactionFilter {
            start_date: Some(start + Duration::days(1)),
            end_date: Some(start + Duration::days(3)),
            ..TransactionFilter::for_user(ledger.user.id)
        };
        let page =
            list_transactions(&filter, TransactionSort::default(), PageRequest::new(1, 20), &conn)
                .unwrap();

        assert_eq!(page.meta.total, 3);
    }

    #[test]
    fn sorts_by_amount_ascending() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        for amount in [dec!(30), dec!(10), dec!(20)] {
            ledger.insert_row(amount, TransactionType::Income, &conn);
        }

        let page = list_transactions(
            &TransactionFilter::for_user(ledger.user.id),
            TransactionSort {
                field: SortField::Amount,
                order: SortOrder::Ascending,
            },
            PageRequest::new(1, 20),
            &conn,
        )
        .unwrap();

        let amounts: Vec<_> = page.transactions.iter().map(|t| t.amount.value()).collect();
        assert_eq!(amounts, vec![dec!(10), dec!(20), dec!(30)]);
    }

    #[test]
    fn defaults_to_newest_first() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        let oldest = ledger.insert_row_with(
            dec!(1),
            TransactionType::Income,
            "old",
            ledger.date - Duration::days(2),
            &conn,
        );
        let newest =
            ledger.insert_row_with(dec!(1), TransactionType::Income, "new", ledger.date, &conn);

        let page = list_transactions(
            &TransactionFilter::for_user(ledger.user.id),
            TransactionSort::default(),
            PageRequest::new(1, 20),
            &conn,
        )
        .unwrap();

        assert_eq!(page.transactions, vec![newest, oldest]);
    }

    #[test]
    fn paginates_results() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        for i in 1..=25 {
            ledger.insert_row(i.into(), TransactionType::Income, &conn);
        }

        let page = list_transactions(
            &TransactionFilter::for_user(ledger.user.id),
            TransactionSort {
                field: SortField::Amount,
                order: SortOrder::Ascending,
            },
            PageRequest::new(3, 10),
            &conn,
        )
        .unwrap();

        assert_eq!(page.transactions.len(), 5);
        assert_eq!(page.transactions[0].amount.value(), dec!(21));
        assert_eq!(page.meta.total, 25);
        assert_eq!(page.meta.total_pages, 3);
    }

    #[test]
    fn recent_transactions_include_names() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        for i in 1..=4 {
            ledger.insert_row_with(
                i.into(),
                TransactionType::Expense,
                "",
                ledger.date + Duration::hours(i),
                &conn,
            );
        }

        let page =
            list_recent_transactions(ledger.user.id, PageRequest::new(1, 3), &conn).unwrap();

        assert_eq!(page.transactions.len(), 3);
        assert_eq!(page.transactions[0].transaction.amount.value(), dec!(4));
        assert_eq!(page.transactions[0].account_name, ledger.account.name.to_string());
        assert_eq!(
            page.transactions[0].category_name,
            ledger.expense_category.name.to_string()
        );
        assert_eq!(page.meta.total, 4);
    }

    #[test]
    fn recent_transactions_are_empty_for_new_user() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);

        let page = list_recent_transactions(
            UserID::new(ledger.user.id.as_i64() + 1),
            PageRequest::new(1, 3),
            &conn,
        )
        .unwrap();

        assert!(page.transactions.is_empty());
        assert_eq!(page.meta.total_pages, 0);
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
    }
}
