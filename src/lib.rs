//! `br_offplan` calculates the payment schedule of a real estate unit bought "na planta"
//! (off-plan), where the buyer pays the developer while the building is under construction.
//!
//! A schedule is built from:
//! - **Down payment**: paid at month 0, either as an amount or as a percentage of the price.
//! - **Monthly correction**: a percentage (for instance INCC before the keys, IPCA after) that
//!   inflates the outstanding balance and every payment.
//! - **Installments**: either spread automatically (even regular installments plus optional
//!   periodic reinforcements and a keys payment) or listed one by one.
//!
//! Besides the outstanding balance, every row carries a **net balance**: a second ledger that
//! starts at price minus down payment minus discount and goes down by each corrected payment.
//!
//! ## Usage
//!
//! ```rust
//! use br_offplan::{calculate_schedule_with, CalculationOptions, FinancingInput};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let mut input = FinancingInput::new(dec!(500_000), dec!(50_000), 36, 36, dec!(0.5), dec!(0.5));
//! input.discount = Some(dec!(10_000));
//!
//! let options = CalculationOptions::with_start_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
//!
//! match calculate_schedule_with(&input, &options) {
//!     Ok(result) => {
//!         for row in &result.installments {
//!             println!("{} {:?} {:.2} {:?}", row.month, row.payment_kind, row.corrected_amount, row.net_balance);
//!         }
//!         println!("Total paid: {:.2}", result.summary.grand_total);
//!     }
//!     Err(e) => {
//!         eprintln!("Error calculating schedule: {}", e);
//!     }
//! }
//! ```

pub mod calendar;
pub mod error;
pub mod input;
pub mod options;
pub mod plan;
pub mod schedule;
pub mod summary;

pub use error::{FinancingError, Result};
pub use input::{
    CustomInstallment, Distribution, FinancingInput, InstallmentKind, InstallmentMode,
    NormalizedInput, Periodicity, Reinforcement, ReinforcementTerms,
};
pub use options::CalculationOptions;
pub use plan::{plan_distribution, DistributionPlan};
pub use schedule::{InstallmentRecord, PaymentKind, ScheduledPayment};
pub use summary::SummaryRecord;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A complete schedule: one row per paid month plus the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub installments: Vec<InstallmentRecord>,
    pub summary: SummaryRecord,
}

/// Calculates the schedule with month 0 on today's date.
///
/// # Errors
///
/// Returns [`FinancingError::Validation`] if the terms violate a constraint or
/// push a value past the `Decimal` range.
pub fn calculate_schedule(input: &FinancingInput) -> Result<ScheduleResult> {
    calculate_schedule_with(input, &CalculationOptions::default())
}

/// Calculates the schedule with explicit options.
///
/// Validation runs before anything else, so either the whole schedule is returned
/// or nothing is.
pub fn calculate_schedule_with(
    input: &FinancingInput,
    options: &CalculationOptions,
) -> Result<ScheduleResult> {
    let normalized = input.normalize()?;
    debug!(
        property_value = %normalized.property_value,
        effective_down_payment = %normalized.effective_down_payment,
        discount = %normalized.discount,
        delivery_term_months = normalized.delivery_term_months,
        payment_term_months = normalized.payment_term_months,
        mode = ?input.installment_mode,
        "normalized financing input"
    );

    let installments = schedule::build_installments(&normalized, options.start_date)?;
    let summary = summary::summarize(&normalized, &installments)?;

    info!(
        rows = installments.len(),
        grand_total = %summary.grand_total,
        "calculated off-plan schedule"
    );

    Ok(ScheduleResult {
        installments,
        summary,
    })
}

/// JSON in, JSON out: parses a [`FinancingInput`] and returns the serialized
/// [`ScheduleResult`].
pub fn calculate_from_json(request: &str, options: &CalculationOptions) -> Result<String> {
    let input: FinancingInput = serde_json::from_str(request)?;
    let result = calculate_schedule_with(&input, options)?;
    Ok(serde_json::to_string(&result)?)
}
