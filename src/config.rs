//! Settings shared by every ledger operation a caller makes.

use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    Error,
    db::initialize,
    ledger::{BalanceMode, get_last_balance_mode, rebuild_stored_balances, save_balance_mode},
    pagination::PaginationConfig,
    timezone::get_local_offset,
};

/// The timezone used for calendar months when none is configured.
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

/// The number of days the category summary covers by default.
const DEFAULT_CATEGORY_WINDOW_DAYS: u32 = 30;

/// How the ledger is kept and how results are presented.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Whether account balances are derived from the ledger or stored.
    pub balance_mode: BalanceMode,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,

    /// The number of days leading up to now that the category summary covers.
    pub category_window_days: u32,

    /// The config that controls how to page listings.
    pub pagination: PaginationConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_mode: BalanceMode::default(),
            local_timezone: DEFAULT_TIMEZONE.to_owned(),
            category_window_days: DEFAULT_CATEGORY_WINDOW_DAYS,
            pagination: PaginationConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// The UTC offset of the configured timezone right now.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if `local_timezone` is not a
    /// canonical timezone name.
    pub fn local_offset(&self) -> Result<UtcOffset, Error> {
        get_local_offset(&self.local_timezone)
    }

    /// Create any missing tables and remember the configured balance mode.
    ///
    /// Stored balances are not maintained while the database is used with
    /// [BalanceMode::Derived], so they are rebuilt from the ledger when the
    /// database switches to [BalanceMode::Stored]. Opening it again in the
    /// same mode leaves stored balances untouched.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn prepare_database(&self, connection: &Connection) -> Result<(), Error> {
        initialize(connection)?;

        let last_mode = get_last_balance_mode(connection)?;
        if last_mode == Some(self.balance_mode) {
            return Ok(());
        }

        if self.balance_mode == BalanceMode::Stored {
            rebuild_stored_balances(connection)?;
        }
        save_balance_mode(self.balance_mode, connection)?;

        tracing::debug!(
            "balance mode changed from {last_mode:?} to {}",
            self.balance_mode
        );

        Ok(())
    }
}
