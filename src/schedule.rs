use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};

use crate::calendar::due_date;
use crate::error::{FinancingError, Result};
use crate::input::{Distribution, InstallmentKind, NormalizedInput};
use crate::plan::plan_distribution;

/// What a schedule row pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    DownPayment,
    Installment,
    Reinforcement,
    Keys,
}

impl From<InstallmentKind> for PaymentKind {
    fn from(kind: InstallmentKind) -> Self {
        match kind {
            InstallmentKind::Installment => PaymentKind::Installment,
            InstallmentKind::Reinforcement => PaymentKind::Reinforcement,
            InstallmentKind::Keys => PaymentKind::Keys,
        }
    }
}

/// A payment due in a given month, before any correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledPayment {
    pub month: u32,
    pub kind: PaymentKind,
    pub base_amount: Decimal,
}

/// One month of the payment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentRecord {
    pub month: u32,
    pub date: NaiveDate,
    pub payment_kind: PaymentKind,
    /// Amount before correction.
    pub base_amount: Decimal,
    /// Correction percentage applied in this month.
    pub correction_rate_percent: Decimal,
    /// `base_amount` inflated by the accumulated correction.
    pub corrected_amount: Decimal,
    /// Balance owed after this month's correction and payment.
    pub outstanding_balance: Decimal,
    /// Discount-aware balance. Always `None` for the down payment row.
    pub net_balance: Option<Decimal>,
    /// Running sum of the monthly correction percentages.
    pub accumulated_correction_percent: Decimal,
}

/// Payments for months `1..=payment_term_months`, in month order.
///
/// Custom payments scheduled after the payment term are dropped.
pub fn scheduled_payments(input: &NormalizedInput) -> Result<Vec<ScheduledPayment>> {
    let payments = match &input.distribution {
        Distribution::Automatic {
            reinforcement,
            keys_amount,
        } => {
            let plan = plan_distribution(
                input.initial_outstanding,
                input.delivery_term_months,
                input.payment_term_months,
                *reinforcement,
                *keys_amount,
            )?;
            (1..=input.payment_term_months)
                .map(|month| {
                    let (kind, base_amount) = plan.payment_for(month);
                    ScheduledPayment {
                        month,
                        kind,
                        base_amount,
                    }
                })
                .collect()
        }
        Distribution::Custom(installments) => {
            for ignored in installments
                .keys()
                .filter(|month| **month > input.payment_term_months)
            {
                warn!(
                    month = *ignored,
                    payment_term_months = input.payment_term_months,
                    "custom installment falls after the payment term and is ignored"
                );
            }
            installments
                .range(1..=input.payment_term_months)
                .map(|(month, installment)| ScheduledPayment {
                    month: *month,
                    kind: installment.kind.into(),
                    base_amount: installment.amount,
                })
                .collect()
        }
    };
    Ok(payments)
}

/// Month 0: the down payment, with no correction and no net balance.
pub fn down_payment_row(input: &NormalizedInput, start_date: NaiveDate) -> InstallmentRecord {
    InstallmentRecord {
        month: 0,
        date: start_date,
        payment_kind: PaymentKind::DownPayment,
        base_amount: input.effective_down_payment,
        correction_rate_percent: Decimal::ZERO,
        corrected_amount: input.effective_down_payment,
        outstanding_balance: input.initial_outstanding,
        net_balance: None,
        accumulated_correction_percent: Decimal::ZERO,
    }
}

/// Computes the row for `payment` from the row emitted just before it.
///
/// The outstanding balance is corrected before the payment is taken off. The
/// payment itself is inflated by the sum of the monthly rates so far, not by
/// their compounded product. The net balance ignores the outstanding balance:
/// the first installment row opens it at price minus down payment minus
/// discount, and every later row subtracts the previous row's corrected
/// payment.
///
/// Only the row right after month 0 opens the net balance. A sparse custom
/// schedule keeps chaining across the skipped months rather than reopening
/// the balance at every gap.
///
/// # Errors
///
/// Returns [`FinancingError::Validation`] naming the correction rate in force
/// when a value leaves the `Decimal` range.
pub fn advance(
    input: &NormalizedInput,
    previous: Option<&InstallmentRecord>,
    payment: ScheduledPayment,
    start_date: NaiveDate,
) -> Result<InstallmentRecord> {
    let Some(previous) = previous else {
        error!(month = payment.month, "no previous row to continue the schedule from");
        return Err(FinancingError::InternalInconsistency {
            month: payment.month,
            reason: "no previous row to continue the schedule from".to_string(),
        });
    };

    let rate = input.correction_rate_for(payment.month);
    let out_of_range = || FinancingError::out_of_range(input.correction_rate_field(payment.month));

    let outstanding_balance = previous
        .outstanding_balance
        .checked_mul(rate)
        .and_then(|correction| correction.checked_div(dec!(100)))
        .and_then(|correction| previous.outstanding_balance.checked_add(correction))
        .ok_or_else(out_of_range)?;

    let accumulated_correction_percent = previous
        .accumulated_correction_percent
        .checked_add(rate)
        .ok_or_else(out_of_range)?;
    let corrected_amount = accumulated_correction_percent
        .checked_div(dec!(100))
        .and_then(|factor| Decimal::ONE.checked_add(factor))
        .and_then(|factor| payment.base_amount.checked_mul(factor))
        .ok_or_else(out_of_range)?;

    let outstanding_balance = outstanding_balance
        .checked_sub(corrected_amount)
        .ok_or_else(out_of_range)?;

    let net_balance = if previous.month == 0 {
        Some(input.opening_net_balance)
    } else {
        match previous.net_balance {
            Some(net_balance) => Some(
                net_balance
                    .checked_sub(previous.corrected_amount)
                    .ok_or_else(out_of_range)?,
            ),
            None => None,
        }
    };

    let row = InstallmentRecord {
        month: payment.month,
        date: due_date(start_date, payment.month)?,
        payment_kind: payment.kind,
        base_amount: payment.base_amount,
        correction_rate_percent: rate,
        corrected_amount,
        outstanding_balance,
        net_balance,
        accumulated_correction_percent,
    };

    trace!(
        month = row.month,
        kind = ?row.payment_kind,
        base_amount = %row.base_amount,
        corrected_amount = %row.corrected_amount,
        outstanding_balance = %row.outstanding_balance,
        net_balance = ?row.net_balance,
        "emitted schedule row"
    );

    Ok(row)
}

/// Builds every row of the schedule, month 0 first.
pub fn build_installments(
    input: &NormalizedInput,
    start_date: NaiveDate,
) -> Result<Vec<InstallmentRecord>> {
    scheduled_payments(input)?.into_iter().try_fold(
        vec![down_payment_row(input, start_date)],
        |mut rows, payment| {
            let row = advance(input, rows.last(), payment, start_date)?;
            rows.push(row);
            Ok(rows)
        },
    )
}
