//! Categories group transactions into kinds of income and expense, e.g.
//! "Salary" or "Rent".

mod db;
mod domain;

pub use db::{create_category, create_category_table, get_category, list_categories};
pub use domain::{Category, CategoryName};
