use chrono::{Months, NaiveDate};

use crate::error::{FinancingError, Result};

/// Returns the due date `months` months after `start`.
///
/// The day of month is kept when it exists in the target month and clamped to
/// the month's last day otherwise (Jan 31 + 1 month is Feb 28, or Feb 29 in a
/// leap year).
pub fn due_date(start: NaiveDate, months: u32) -> Result<NaiveDate> {
    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            FinancingError::validation(
                "paymentTermMonths",
                format!("{months} months after {start} is outside the supported calendar"),
            )
        })
}
