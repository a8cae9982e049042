#![allow(missing_docs)]

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{OffsetDateTime, macros::datetime};

use crate::{
    Account, AccountName, AccountType, Amount, BalanceMode, Category, CategoryName, Transaction,
    TransactionType, User, create_account, create_category, create_user, db::initialize,
    insert_transaction,
};

pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

/// A user with one account, one income category and one expense category.
pub(crate) struct TestLedger {
    pub(crate) user: User,
    pub(crate) account: Account,
    pub(crate) income_category: Category,
    pub(crate) expense_category: Category,
    /// The date given to transactions inserted with [TestLedger::insert_row].
    pub(crate) date: OffsetDateTime,
}

impl TestLedger {
    #[track_caller]
    pub(crate) fn new(connection: &Connection) -> Self {
        Self::with_email("test@email.com", connection)
    }

    #[track_caller]
    pub(crate) fn with_email(email: &str, connection: &Connection) -> Self {
        let user = create_user("Test User", email, connection).expect("Could not create user");
        let account = create_account(
            AccountName::new_unchecked("Conta Corrente"),
            AccountType::Checking,
            user.id,
            connection,
        )
        .expect("Could not create account");
        let income_category = create_category(
            CategoryName::new_unchecked("Salário"),
            TransactionType::Income,
            user.id,
            connection,
        )
        .expect("Could not create income category");
        let expense_category = create_category(
            CategoryName::new_unchecked("Aluguel"),
            TransactionType::Expense,
            user.id,
            connection,
        )
        .expect("Could not create expense category");

        Self {
            user,
            account,
            income_category,
            expense_category,
            date: datetime!(2025-10-05 12:00:00 UTC),
        }
    }

    /// Record a transaction in the test account with stored balances, so
    /// both balance modes read the same value afterwards.
    #[track_caller]
    pub(crate) fn insert_row(
        &self,
        amount: Decimal,
        transaction_type: TransactionType,
        connection: &Connection,
    ) -> Transaction {
        self.insert_row_with(amount, transaction_type, "", self.date, connection)
    }

    #[track_caller]
    pub(crate) fn insert_row_with(
        &self,
        amount: Decimal,
        transaction_type: TransactionType,
        description: &str,
        date: OffsetDateTime,
        connection: &Connection,
    ) -> Transaction {
        let category_id = match transaction_type {
            TransactionType::Income => self.income_category.id,
            TransactionType::Expense => self.expense_category.id,
        };

        insert_transaction(
            &Transaction::build(
                self.account.id,
                category_id,
                Amount::new(amount).expect("Invalid test amount"),
                transaction_type,
                date,
            )
            .description(Some(description)),
            self.user.id,
            BalanceMode::Stored,
            connection,
        )
        .expect("Could not insert transaction")
    }
}
