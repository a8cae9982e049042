use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error,
    account::{AccountName, get_account},
    category::{CategoryName, get_category},
    database_id::{AccountId, CategoryId},
    ledger::BalanceMode,
    pagination::{PageMeta, PageRequest},
    transaction::{
        Transaction, TransactionFilter, TransactionSort, TransactionType, list_transactions,
    },
};

/// A page of transactions grouped by account, then by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialOverview {
    /// The accounts with transactions on this page, in order of their first
    /// transaction.
    pub accounts: Vec<AccountOverview>,
    /// Where the page sits in the full listing, counted in transactions.
    pub meta: PageMeta,
}

/// An account and the page's transactions in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountOverview {
    /// The account ID.
    pub id: AccountId,
    /// The account name.
    pub name: AccountName,
    /// The account balance under the configured [BalanceMode].
    pub balance: Decimal,
    /// The categories with transactions on this page.
    pub categories: Vec<CategoryOverview>,
}

/// A category and the page's transactions in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOverview {
    /// The category ID.
    pub id: CategoryId,
    /// The category name.
    pub name: CategoryName,
    /// Whether the category holds incomes or expenses.
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// The transactions, in listing order.
    pub transactions: Vec<Transaction>,
}

/// List a page of the transactions matching `filter` grouped by account and
/// category.
///
/// Groups keep the order in which their first transaction appears in the
/// sorted listing.
pub fn list_financial_overview(
    filter: &TransactionFilter,
    sort: TransactionSort,
    page: PageRequest,
    mode: BalanceMode,
    connection: &Connection,
) -> Result<FinancialOverview, Error> {
    let listing = list_transactions(filter, sort, page, connection)?;

    let mut accounts: Vec<AccountOverview> = Vec::new();

    for transaction in listing.transactions {
        let account_index = match accounts
            .iter()
            .position(|account| account.id == transaction.account_id)
        {
            Some(index) => index,
            None => {
                let account = get_account(transaction.account_id, filter.user_id, mode, connection)?;
                accounts.push(AccountOverview {
                    id: account.id,
                    name: account.name,
                    balance: account.balance,
                    categories: Vec::new(),
                });
                accounts.len() - 1
            }
        };
        let categories = &mut accounts[account_index].categories;

        let category_index = match categories
            .iter()
            .position(|category| category.id == transaction.category_id)
        {
            Some(index) => index,
            None => {
                let category = get_category(transaction.category_id, filter.user_id, connection)?;
                categories.push(CategoryOverview {
                    id: category.id,
                    name: category.name,
                    category_type: category.category_type,
                    transactions: Vec::new(),
                });
                categories.len() - 1
            }
        };

        categories[category_index].transactions.push(transaction);
    }

    Ok(FinancialOverview {
        accounts,
        meta: listing.meta,
    })
}

#[cfg(test)]
mod financial_overview_tests {
    use rust_decimal_macros::dec;
    use time::{Duration, macros::datetime};

    use crate::{
        AccountName, AccountType, Amount, BalanceMode, PageRequest, Transaction,
        TransactionFilter, TransactionSort, TransactionType, create_account, insert_transaction,
        test_utils::{TestLedger, get_test_connection},
    };

    use super::list_financial_overview;

    #[test]
    fn groups_page_by_account_then_category() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        let wallet = create_account(
            AccountName::new_unchecked("Dinheiro"),
            AccountType::Cash,
            ledger.user.id,
            &conn,
        )
        .unwrap();
        let start = datetime!(2025-05-01 12:00 UTC);
        ledger.insert_row_with(dec!(4800), TransactionType::Income, "", start, &conn);
        let wallet_expense = insert_transaction(
            &Transaction::build(
                wallet.id,
                ledger.expense_category.id,
                Amount::new(dec!(25)).unwrap(),
                TransactionType::Expense,
                start + Duration::days(1),
            ),
            ledger.user.id,
            BalanceMode::Stored,
            &conn,
        )
        .unwrap();
        let rent_date = start + Duration::days(2);
        ledger.insert_row_with(dec!(1200), TransactionType::Expense, "", rent_date, &conn);

        let overview = list_financial_overview(
            &TransactionFilter::for_user(ledger.user.id),
            TransactionSort::default(),
            PageRequest::new(1, 10),
            BalanceMode::Derived,
            &conn,
        )
        .unwrap();

        assert_eq!(overview.meta.total, 3);
        assert_eq!(overview.accounts.len(), 2);
        let checking = &overview.accounts[0];
        assert_eq!(checking.id, ledger.account.id);
        assert_eq!(checking.balance, dec!(3600));
        let category_ids: Vec<i64> = checking.categories.iter().map(|c| c.id).collect();
        assert_eq!(
            category_ids,
            vec![ledger.expense_category.id, ledger.income_category.id]
        );
        let wallet_overview = &overview.accounts[1];
        assert_eq!(wallet_overview.balance, dec!(-25));
        assert_eq!(
            wallet_overview.categories[0].transactions,
            vec![wallet_expense]
        );
    }

    #[test]
    fn pages_count_transactions() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        for amount in 1..=5 {
            ledger.insert_row(amount.into(), TransactionType::Income, &conn);
        }

        let overview = list_financial_overview(
            &TransactionFilter::for_user(ledger.user.id),
            TransactionSort::default(),
            PageRequest::new(3, 2),
            BalanceMode::Stored,
            &conn,
        )
        .unwrap();

        assert_eq!(overview.meta.total, 5);
        assert_eq!(overview.meta.total_pages, 3);
        assert_eq!(overview.accounts[0].categories[0].transactions.len(), 1);
        assert_eq!(overview.accounts[0].balance, dec!(15));
    }
}
