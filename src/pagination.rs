//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The largest page size a caller may ask for.
pub const MAX_PAGE_SIZE: u64 = 100;

/// The config for pagination
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of transactions per page when listing transactions.
    pub transactions_page_size: u64,
    /// The number of transactions per page when listing recent transactions.
    pub recent_transactions_page_size: u64,
    /// The number of categories per page in the category summary.
    pub category_summary_page_size: u64,
    /// The number of transactions per page in the financial overview.
    pub overview_page_size: u64,
    /// The number of accounts per page when listing accounts.
    pub accounts_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            transactions_page_size: 20,
            recent_transactions_page_size: 3,
            category_summary_page_size: 6,
            overview_page_size: 10,
            accounts_page_size: 20,
        }
    }
}

impl PaginationConfig {
    /// Fill in a page request from optional caller input, using `default_page_size`
    /// when no limit was given.
    pub fn request(
        &self,
        page: Option<u64>,
        limit: Option<u64>,
        default_page_size: u64,
    ) -> PageRequest {
        PageRequest::new(
            page.unwrap_or(self.default_page),
            limit.unwrap_or(default_page_size),
        )
    }
}

/// A 1-based page number and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The page to fetch, starting from 1.
    pub page: u64,
    /// The maximum number of items on a page.
    pub limit: u64,
}

impl PageRequest {
    /// Create a page request, clamping the page to at least 1 and the limit to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// The number of rows to skip to reach this page.
    pub(crate) fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Describe this page given the total number of items across all pages.
    pub(crate) fn meta(&self, total: u64) -> PageMeta {
        PageMeta {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total.div_ceil(self.limit),
        }
    }
}

/// Describes where a page sits in the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// The current page, starting from 1.
    pub page: u64,
    /// The page size used.
    pub limit: u64,
    /// The number of items across all pages.
    pub total: u64,
    /// The number of pages needed to show every item.
    pub total_pages: u64,
}
