use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error, money::from_cents, transaction::TransactionFilter, user::UserID,
    window::{DateTimeRange, current_month_range},
};

use super::balance::sum_by_type;

/// A user's all-time balance and the current month's income and expenses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    /// All-time income minus all-time expenses.
    pub total_balance: Decimal,
    /// Income in the current calendar month.
    pub month_income: Decimal,
    /// Expenses in the current calendar month, as a positive amount.
    pub month_expense: Decimal,
    /// The current calendar month in the local timezone.
    pub month: DateTimeRange,
}

/// Summarise the finances of `user_id`.
///
/// The current month is the calendar month containing `now` in the timezone
/// given by `local_offset`, from the first day at 00:00:00 to the last day at
/// 23:59:59.
pub fn get_financial_summary(
    user_id: UserID,
    now: OffsetDateTime,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<FinancialSummary, Error> {
    let month = current_month_range(now, local_offset)?;

    let all_time = sum_by_type(&TransactionFilter::for_user(user_id), connection)?;
    let this_month = sum_by_type(
        &TransactionFilter {
            start_date: Some(month.start),
            end_date: Some(month.end),
            ..TransactionFilter::for_user(user_id)
        },
        connection,
    )?;

    Ok(FinancialSummary {
        total_balance: from_cents(all_time.net()),
        month_income: from_cents(this_month.income),
        month_expense: from_cents(this_month.expense),
        month,
    })
}

#[cfg(test)]
mod financial_summary_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{UtcOffset, macros::datetime};

    use crate::{
        TransactionType, create_user,
        test_utils::{TestLedger, get_test_connection},
    };

    use super::get_financial_summary;

    #[test]
    fn splits_all_time_and_current_month() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        let offset = UtcOffset::from_hms(-3, 0, 0).unwrap();
        let now = datetime!(2025-07-15 12:00:00 -3);
        for (amount, transaction_type, date) in [
            (dec!(4800), TransactionType::Income, datetime!(2025-06-05 09:00 -3)),
            (dec!(1200), TransactionType::Expense, datetime!(2025-06-10 09:00 -3)),
            (dec!(4800), TransactionType::Income, datetime!(2025-07-05 09:00 -3)),
            (dec!(89.90), TransactionType::Expense, datetime!(2025-07-01 00:00 -3)),
            (dec!(150.10), TransactionType::Expense, datetime!(2025-07-31 23:59:59 -3)),
        ] {
            ledger.insert_row_with(amount, transaction_type, "", date, &conn);
        }

        let summary = get_financial_summary(ledger.user.id, now, offset, &conn).unwrap();

        assert_eq!(summary.total_balance, dec!(8160));
        assert_eq!(summary.month_income, dec!(4800));
        assert_eq!(summary.month_expense, dec!(240));
        assert_eq!(summary.month.start, datetime!(2025-07-01 00:00 -3));
    }

    #[test]
    fn repeated_reads_are_identical() {
        let conn = get_test_connection();
        let ledger = TestLedger::new(&conn);
        ledger.insert_row(dec!(10), TransactionType::Income, &conn);
        let now = datetime!(2025-07-15 12:00:00 UTC);

        let first = get_financial_summary(ledger.user.id, now, UtcOffset::UTC, &conn);
        let second = get_financial_summary(ledger.user.id, now, UtcOffset::UTC, &conn);

        assert_eq!(first, second);
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        let conn = get_test_connection();
        let user = create_user("Empty", "empty@email.com", &conn).unwrap();
        let now = datetime!(2025-07-15 12:00:00 UTC);

        let summary = get_financial_summary(user.id, now, UtcOffset::UTC, &conn).unwrap();

        assert_eq!(summary.total_balance, Decimal::ZERO);
        assert_eq!(summary.month_income, Decimal::ZERO);
        assert_eq!(summary.month_expense, Decimal::ZERO);
    }
}
