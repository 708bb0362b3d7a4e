use chrono::{Local, NaiveDate};

/// Settings that shape a calculation without being part of the financing terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationOptions {
    /// Calendar date of month 0 (the down payment).
    pub start_date: NaiveDate,
}

impl CalculationOptions {
    pub fn with_start_date(start_date: NaiveDate) -> Self {
        CalculationOptions { start_date }
    }
}

impl Default for CalculationOptions {
    /// Anchors month 0 on today's local date.
    fn default() -> Self {
        CalculationOptions {
            start_date: Local::now().date_naive(),
        }
    }
}
