//! Transaction management.
//!
//! This module contains everything related to transaction records:
//! - The `Transaction` model and the `NewTransaction` builder
//! - Row level database functions used by the ledger
//! - Filtered and paginated transaction listings
//!
//! Inserting, editing and deleting transactions goes through the ledger so
//! that account balances stay consistent, see [crate::insert_transaction].

mod core;
mod query;

pub use core::{
    NewTransaction, Transaction, TransactionType, TransactionUpdate, count_transactions,
    create_transaction_table, get_transaction,
};
pub use query::{
    RecentTransaction, RecentTransactionPage, SortField, SortOrder, TransactionFilter,
    TransactionPage, TransactionSort, list_recent_transactions, list_transactions,
};

pub(crate) use core::{
    delete_transaction_row, insert_transaction_row, map_transaction_row, update_transaction_row,
};
