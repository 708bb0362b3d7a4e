use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{FinancingError, Result};
use crate::input::ReinforcementTerms;
use crate::schedule::PaymentKind;

/// Which months carry reinforcement and keys payments in automatic mode, and how
/// much each regular installment is worth.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionPlan {
    pub reinforcement_months: BTreeSet<u32>,
    pub reinforcement_amount: Decimal,
    pub total_reinforcement: Decimal,
    /// Delivery month, when a keys payment is due.
    pub keys_month: Option<u32>,
    pub keys_amount: Decimal,
    pub regular_month_count: usize,
    /// Balance left for regular installments after reinforcements and keys.
    pub amount_to_distribute: Decimal,
    pub flat_installment: Decimal,
}

impl DistributionPlan {
    /// Base payment for `month`.
    ///
    /// A reinforcement month that is also the keys month is paid as keys.
    pub fn payment_for(&self, month: u32) -> (PaymentKind, Decimal) {
        let mut payment = (PaymentKind::Installment, self.flat_installment);
        if self.reinforcement_months.contains(&month) {
            payment = (PaymentKind::Reinforcement, self.reinforcement_amount);
        }
        if self.keys_month == Some(month) {
            payment = (PaymentKind::Keys, self.keys_amount);
        }
        payment
    }
}

/// Months `period, 2*period, ...` within the payment term that fall on or before delivery.
pub fn reinforcement_months(
    period: u32,
    delivery_term_months: u32,
    payment_term_months: u32,
) -> BTreeSet<u32> {
    if period == 0 {
        return BTreeSet::new();
    }
    (period..=payment_term_months)
        .step_by(period as usize)
        .filter(|month| *month <= delivery_term_months)
        .collect()
}

/// Splits the financed balance between reinforcements, the keys payment and even
/// regular installments.
///
/// The regular installment is zero when no month is left for it.
///
/// # Errors
///
/// Returns [`FinancingError::Validation`] when the reinforcement or keys totals do not fit
/// in a `Decimal`.
pub fn plan_distribution(
    initial_outstanding: Decimal,
    delivery_term_months: u32,
    payment_term_months: u32,
    reinforcement: Option<ReinforcementTerms>,
    keys_amount: Decimal,
) -> Result<DistributionPlan> {
    let (reinforcement_months, reinforcement_amount) = match reinforcement {
        Some(terms) if terms.amount > Decimal::ZERO => (
            reinforcement_months(
                terms.periodicity.months(),
                delivery_term_months,
                payment_term_months,
            ),
            terms.amount,
        ),
        _ => (BTreeSet::new(), Decimal::ZERO),
    };
    let total_reinforcement = Decimal::from(reinforcement_months.len())
        .checked_mul(reinforcement_amount)
        .ok_or_else(|| FinancingError::out_of_range("reinforcement.amount"))?;

    let keys_month = (keys_amount > Decimal::ZERO).then_some(delivery_term_months);
    if keys_month.is_some() && delivery_term_months > payment_term_months {
        warn!(
            delivery_term_months,
            payment_term_months,
            %keys_amount,
            "keys payment falls after the payment term and will not be scheduled"
        );
    }

    let regular_month_count = (1..=payment_term_months)
        .filter(|month| !reinforcement_months.contains(month) && keys_month != Some(*month))
        .count();

    let amount_to_distribute = initial_outstanding
        .checked_sub(total_reinforcement)
        .ok_or_else(|| FinancingError::out_of_range("reinforcement.amount"))?
        .checked_sub(keys_amount)
        .ok_or_else(|| FinancingError::out_of_range("keysAmount"))?;
    let flat_installment = if regular_month_count == 0 {
        Decimal::ZERO
    } else {
        amount_to_distribute
            .checked_div(Decimal::from(regular_month_count))
            .unwrap_or(Decimal::ZERO)
    };

    debug!(
        %amount_to_distribute,
        regular_month_count,
        %flat_installment,
        reinforcement_months = ?reinforcement_months,
        %total_reinforcement,
        %keys_amount,
        "planned automatic distribution"
    );

    Ok(DistributionPlan {
        reinforcement_months,
        reinforcement_amount,
        total_reinforcement,
        keys_month,
        keys_amount,
        regular_month_count,
        amount_to_distribute,
        flat_installment,
    })
}
