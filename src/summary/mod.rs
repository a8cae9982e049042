//! Read-side aggregations over the ledger: account balances, category
//! totals, the monthly financial summary and the financial overview.
//!
//! Every query here is a read; repeating one without an intervening write
//! gives the same result.

mod balance;
mod category;
mod financial;
mod overview;

pub use balance::{MonthlyBalance, get_account_balance, get_monthly_balance};
pub use category::{
    CategorySummary, CategorySummaryPage, CategoryTotal, get_balance_by_category,
    get_category_summary,
};
pub use financial::{FinancialSummary, get_financial_summary};
pub use overview::{AccountOverview, CategoryOverview, FinancialOverview, list_financial_overview};
