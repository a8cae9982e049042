//! Accounts hold money: a checking account, a credit card or a wallet of cash.

mod core;
mod db;

pub use core::{Account, AccountName, AccountPage, AccountType};
pub use db::{create_account, create_account_table, get_account, list_accounts};
pub(crate) use db::{apply_balance_delta, balance_expression};
