use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// How account balances are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMode {
    /// Balances are never written, they are summed from the ledger on every read.
    #[default]
    Derived,
    /// Balances are a running total on the account row, adjusted in the same
    /// unit of work as every ledger mutation.
    Stored,
}

impl BalanceMode {
    /// The name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceMode::Derived => "derived",
            BalanceMode::Stored => "stored",
        }
    }
}

impl Display for BalanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "derived" => Ok(BalanceMode::Derived),
            "stored" => Ok(BalanceMode::Stored),
            _ => Err(Error::UnknownType(s.to_owned())),
        }
    }
}

impl ToSql for BalanceMode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for BalanceMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// Create the table that remembers which [BalanceMode] the database was last
/// opened with.
///
/// The table holds at most one row.
pub(crate) fn create_balance_mode_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS balance_mode (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            mode TEXT NOT NULL CHECK (mode IN ('derived', 'stored'))
        )",
        (),
    )?;

    Ok(())
}

/// The [BalanceMode] the database was last opened with, if any.
pub(crate) fn get_last_balance_mode(
    connection: &Connection,
) -> Result<Option<BalanceMode>, Error> {
    connection
        .query_row("SELECT mode FROM balance_mode WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|error| error.into())
}

/// Remember `mode` as the [BalanceMode] the database was last opened with.
pub(crate) fn save_balance_mode(mode: BalanceMode, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO balance_mode (id, mode) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET mode = excluded.mode",
        [mode],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{BalanceMode, Error, test_utils::get_test_connection};

    use super::{get_last_balance_mode, save_balance_mode};

    #[test]
    fn remembers_last_mode() {
        let conn = get_test_connection();

        assert_eq!(get_last_balance_mode(&conn), Ok(None));

        save_balance_mode(BalanceMode::Stored, &conn).unwrap();
        assert_eq!(get_last_balance_mode(&conn), Ok(Some(BalanceMode::Stored)));

        save_balance_mode(BalanceMode::Derived, &conn).unwrap();
        assert_eq!(get_last_balance_mode(&conn), Ok(Some(BalanceMode::Derived)));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("derived".parse(), Ok(BalanceMode::Derived));
        assert_eq!("Stored".parse(), Ok(BalanceMode::Stored));
        assert_eq!(
            "cached".parse::<BalanceMode>(),
            Err(Error::UnknownType("cached".to_owned()))
        );
    }

    #[test]
    fn defaults_to_derived() {
        assert_eq!(BalanceMode::default(), BalanceMode::Derived);
    }
}
