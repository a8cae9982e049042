//! The rules that keep account balances consistent with the transactions
//! recorded against them.
//!
//! Every mutation of the ledger runs as one SQLite transaction: either the
//! transaction row and the balance adjustment are both written, or neither is.

mod core;
mod mode;

pub use core::{delete_transaction, insert_transaction, rebuild_stored_balances, update_transaction};
pub use mode::BalanceMode;
pub(crate) use mode::{create_balance_mode_table, get_last_balance_mode, save_balance_mode};
