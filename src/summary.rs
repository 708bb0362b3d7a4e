use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, Result};
use crate::input::NormalizedInput;
use crate::schedule::InstallmentRecord;

/// Totals over a whole schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub property_value: Decimal,
    /// Effective down payment.
    pub down_payment: Decimal,
    pub financed_amount: Decimal,
    pub delivery_term_months: u32,
    pub payment_term_months: u32,
    /// Number of rows, down payment included.
    pub installment_count: usize,
    /// Sum of the positive differences between corrected and base amounts.
    pub total_correction: Decimal,
    /// `total_correction` relative to the uncorrected total, in percent.
    pub correction_percent: Decimal,
    /// Sum of every corrected amount.
    pub grand_total: Decimal,
}

/// Reduces the rows to their totals.
///
/// # Errors
///
/// Returns [`FinancingError::Validation`] on `propertyValue` when a total leaves
/// the `Decimal` range.
pub fn summarize(input: &NormalizedInput, rows: &[InstallmentRecord]) -> Result<SummaryRecord> {
    let out_of_range = || FinancingError::out_of_range("propertyValue");

    let total_correction = rows
        .iter()
        .filter(|row| row.corrected_amount > row.base_amount)
        .try_fold(Decimal::ZERO, |total, row| {
            row.corrected_amount
                .checked_sub(row.base_amount)
                .and_then(|correction| total.checked_add(correction))
        })
        .ok_or_else(out_of_range)?;
    let grand_total = rows
        .iter()
        .try_fold(Decimal::ZERO, |total, row| total.checked_add(row.corrected_amount))
        .ok_or_else(out_of_range)?;

    let uncorrected_total = grand_total
        .checked_sub(total_correction)
        .ok_or_else(out_of_range)?;
    let correction_percent =
        if total_correction > Decimal::ZERO && uncorrected_total > Decimal::ZERO {
            total_correction
                .checked_div(uncorrected_total)
                .and_then(|ratio| ratio.checked_mul(dec!(100)))
                .ok_or_else(out_of_range)?
        } else {
            Decimal::ZERO
        };

    Ok(SummaryRecord {
        property_value: input.property_value,
        down_payment: input.effective_down_payment,
        financed_amount: input.initial_outstanding,
        delivery_term_months: input.delivery_term_months,
        payment_term_months: input.payment_term_months,
        installment_count: rows.len(),
        total_correction,
        correction_percent,
        grand_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FinancingInput;
    use crate::schedule::build_installments;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_summary_with_correction() {
        let input = FinancingInput::new(dec!(1300), dec!(100), 2, 3, dec!(1), dec!(2))
            .normalize()
            .unwrap();
        let rows = build_installments(&input, start()).unwrap();

        let summary = summarize(&input, &rows).unwrap();

        // Corrected payments: 400 * 1.01, 400 * 1.02, 400 * 1.04
        assert_eq!(summary.installment_count, 4);
        assert_eq!(summary.property_value, dec!(1300));
        assert_eq!(summary.down_payment, dec!(100));
        assert_eq!(summary.financed_amount, dec!(1200));
        assert_eq!(summary.delivery_term_months, 2);
        assert_eq!(summary.payment_term_months, 3);
        assert_eq!(summary.total_correction, dec!(28));
        assert_eq!(summary.grand_total, dec!(1328));
        assert_eq!(summary.correction_percent, dec!(28) / dec!(1300) * dec!(100));
    }

    #[test]
    fn test_summary_without_correction_has_zero_percent() {
        let input = FinancingInput::new(dec!(1300), dec!(100), 2, 3, dec!(0), dec!(0))
            .normalize()
            .unwrap();
        let rows = build_installments(&input, start()).unwrap();

        let summary = summarize(&input, &rows).unwrap();

        assert_eq!(summary.total_correction, dec!(0));
        assert_eq!(summary.correction_percent, dec!(0));
        assert_eq!(summary.grand_total, dec!(1300));
    }

    #[test]
    fn test_summary_ignores_negative_corrections() {
        let input = FinancingInput::new(dec!(1000), dec!(0), 1, 1, dec!(0), dec!(0))
            .normalize()
            .unwrap();
        let mut rows = build_installments(&input, start()).unwrap();
        rows[1].corrected_amount = dec!(900);

        let summary = summarize(&input, &rows).unwrap();

        assert_eq!(summary.total_correction, dec!(0));
        assert_eq!(summary.grand_total, dec!(900));
    }

    #[test]
    fn test_summary_guards_zero_denominator() {
        let input = FinancingInput::new(dec!(1000), dec!(0), 1, 1, dec!(0), dec!(0))
            .normalize()
            .unwrap();
        let mut rows = build_installments(&input, start()).unwrap();
        // A row whose whole value is correction leaves nothing to compare against.
        rows[1].base_amount = dec!(0);
        rows[1].corrected_amount = dec!(10);

        let summary = summarize(&input, &rows).unwrap();

        assert_eq!(summary.total_correction, dec!(10));
        assert_eq!(summary.correction_percent, dec!(0));
    }

    #[test]
    fn test_summary_total_beyond_decimal_range() {
        let input = FinancingInput::new(dec!(1000), dec!(0), 1, 2, dec!(0), dec!(0))
            .normalize()
            .unwrap();
        let mut rows = build_installments(&input, start()).unwrap();
        rows[1].corrected_amount = Decimal::MAX;
        rows[2].corrected_amount = Decimal::MAX;

        let result = summarize(&input, &rows);

        match result {
            Err(FinancingError::Validation { field, .. }) => assert_eq!(field, "propertyValue"),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }
}
