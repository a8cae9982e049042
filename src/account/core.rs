use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::AccountId, pagination::PageMeta, user::UserID};

/// The kind of place money is kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// A bank account.
    Checking,
    /// A credit card.
    Credit,
    /// Physical cash.
    Cash,
}

impl AccountType {
    /// Every account type, in display order.
    pub fn all() -> [AccountType; 3] {
        [AccountType::Checking, AccountType::Credit, AccountType::Cash]
    }

    /// The name used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Credit => "CREDIT",
            AccountType::Cash => "CASH",
        }
    }

    /// A human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Checking => "Checking Account",
            AccountType::Credit => "Credit Card",
            AccountType::Cash => "Cash",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHECKING" => Ok(AccountType::Checking),
            "CREDIT" => Ok(AccountType::Credit),
            "CASH" => Ok(AccountType::Cash),
            _ => Err(Error::UnknownType(s.to_owned())),
        }
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A validated, non-empty account name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountName(String);

impl AccountName {
    /// Create an account name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyName] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create an account name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountName::new(s)
    }
}

impl Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A place money is kept, e.g. a bank account or credit card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The display name.
    pub name: AccountName,
    /// The kind of account.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// The balance, as read under the configured
    /// [BalanceMode](crate::BalanceMode).
    pub balance: Decimal,
    /// The user that owns the account.
    pub user_id: UserID,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A page of accounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountPage {
    /// The accounts on this page, ordered by name.
    pub accounts: Vec<Account>,
    /// Where the page sits in the full listing.
    pub meta: PageMeta,
}

#[cfg(test)]
mod account_type_tests {
    use crate::{AccountType, Error};

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("checking".parse(), Ok(AccountType::Checking));
        assert_eq!(" Credit ".parse(), Ok(AccountType::Credit));
        assert_eq!("CASH".parse(), Ok(AccountType::Cash));
    }

    #[test]
    fn rejects_unknown_types() {
        assert_eq!(
            "savings".parse::<AccountType>(),
            Err(Error::UnknownType("savings".to_owned()))
        );
    }

    #[test]
    fn labels() {
        let labels: Vec<&str> = AccountType::all().iter().map(AccountType::label).collect();

        assert_eq!(labels, vec!["Checking Account", "Credit Card", "Cash"]);
    }
}
