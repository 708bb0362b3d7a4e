use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, Result};

/// Longest payment or delivery term accepted, in months.
pub const MAX_TERM_MONTHS: u32 = 1200;

/// How the financed balance is split into monthly payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallmentMode {
    /// Regular installments absorb whatever reinforcements and keys leave over.
    #[default]
    Automatic,
    /// The buyer lists every payment explicitly.
    Custom,
}

/// Spacing between reinforcement payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Periodicity {
    Quarterly,
    Semiannual,
    Annual,
}

impl Periodicity {
    pub fn months(self) -> u32 {
        match self {
            Periodicity::Quarterly => 3,
            Periodicity::Semiannual => 6,
            Periodicity::Annual => 12,
        }
    }
}

/// Periodic supplemental payment settings as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reinforcement {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub periodicity: Option<Periodicity>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Kind of a user-supplied payment. The down payment is always derived, never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentKind {
    Installment,
    Reinforcement,
    Keys,
}

/// One explicitly scheduled payment in custom mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomInstallment {
    pub month: u32,
    pub amount: Decimal,
    pub kind: InstallmentKind,
}

/// Terms of one off-plan purchase.
///
/// Percentages are plain percent values (`0.5` means 0.5% per month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingInput {
    /// Price of the unit.
    pub property_value: Decimal,
    /// Down payment paid at month 0. Ignored when `down_payment_percent` is above zero.
    #[serde(default)]
    pub down_payment: Decimal,
    /// Down payment as a percentage of the property value. Zero counts as not given.
    #[serde(default)]
    pub down_payment_percent: Option<Decimal>,
    /// One-time deduction that only affects the net balance ledger.
    #[serde(default)]
    pub discount: Option<Decimal>,
    /// Month in which the keys are handed over.
    pub delivery_term_months: u32,
    /// Last month with a scheduled payment.
    pub payment_term_months: u32,
    /// Monthly correction applied up to and including the delivery month.
    pub correction_rate_until_keys: Decimal,
    /// Monthly correction applied after the delivery month.
    pub correction_rate_after_keys: Decimal,
    #[serde(default)]
    pub installment_mode: InstallmentMode,
    #[serde(default)]
    pub reinforcement: Option<Reinforcement>,
    /// Payment due in the delivery month.
    #[serde(default)]
    pub keys_amount: Option<Decimal>,
    #[serde(default)]
    pub custom_installments: Option<Vec<CustomInstallment>>,
}

/// Reinforcement settings after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReinforcementTerms {
    pub periodicity: Periodicity,
    pub amount: Decimal,
}

/// Where the monthly payments come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Automatic {
        reinforcement: Option<ReinforcementTerms>,
        keys_amount: Decimal,
    },
    /// Custom payments keyed by month.
    Custom(BTreeMap<u32, CustomInstallment>),
}

/// Validated input with every derived quantity resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub property_value: Decimal,
    pub effective_down_payment: Decimal,
    pub discount: Decimal,
    /// Balance owed right after the down payment.
    pub initial_outstanding: Decimal,
    pub delivery_term_months: u32,
    pub payment_term_months: u32,
    pub correction_rate_until_keys: Decimal,
    pub correction_rate_after_keys: Decimal,
    /// Net balance of the first installment row: price minus down payment minus discount.
    pub opening_net_balance: Decimal,
    pub distribution: Distribution,
}

impl NormalizedInput {
    /// Correction percentage that applies in `month`.
    pub fn correction_rate_for(&self, month: u32) -> Decimal {
        if month <= self.delivery_term_months {
            self.correction_rate_until_keys
        } else {
            self.correction_rate_after_keys
        }
    }

    /// Wire name of the rate that applies in `month`.
    pub fn correction_rate_field(&self, month: u32) -> &'static str {
        if month <= self.delivery_term_months {
            "correctionRateUntilKeys"
        } else {
            "correctionRateAfterKeys"
        }
    }
}

fn ensure_positive(field: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(FinancingError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(FinancingError::validation(field, "must not be negative"));
    }
    Ok(())
}

fn ensure_term(field: &str, months: u32) -> Result<()> {
    if months == 0 {
        return Err(FinancingError::validation(field, "must be greater than zero"));
    }
    if months > MAX_TERM_MONTHS {
        return Err(FinancingError::validation(
            field,
            format!("must not exceed {MAX_TERM_MONTHS} months"),
        ));
    }
    Ok(())
}

impl FinancingInput {
    /// Builds automatic-mode terms without discount, keys payment or reinforcement.
    pub fn new(
        property_value: Decimal,
        down_payment: Decimal,
        delivery_term_months: u32,
        payment_term_months: u32,
        correction_rate_until_keys: Decimal,
        correction_rate_after_keys: Decimal,
    ) -> Self {
        FinancingInput {
            property_value,
            down_payment,
            down_payment_percent: None,
            discount: None,
            delivery_term_months,
            payment_term_months,
            correction_rate_until_keys,
            correction_rate_after_keys,
            installment_mode: InstallmentMode::Automatic,
            reinforcement: None,
            keys_amount: None,
            custom_installments: None,
        }
    }

    /// Down payment actually charged at month 0.
    ///
    /// A positive percentage wins over the absolute value and is rounded to cents.
    /// A zero percentage counts as not supplied.
    pub fn effective_down_payment(&self) -> Result<Decimal> {
        match self.down_payment_percent {
            Some(percent) if percent > Decimal::ZERO => self
                .property_value
                .checked_mul(percent)
                .and_then(|value| value.checked_div(dec!(100)))
                .map(|value| {
                    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                })
                .ok_or_else(|| FinancingError::out_of_range("propertyValue")),
            _ => Ok(self.down_payment),
        }
    }

    /// Checks every constraint on the terms. The first violation found is returned.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("propertyValue", self.property_value)?;
        ensure_non_negative("downPayment", self.down_payment)?;
        if let Some(percent) = self.down_payment_percent {
            ensure_non_negative("downPaymentPercent", percent)?;
        }
        if let Some(discount) = self.discount {
            ensure_non_negative("discount", discount)?;
        }
        ensure_term("deliveryTermMonths", self.delivery_term_months)?;
        ensure_term("paymentTermMonths", self.payment_term_months)?;
        ensure_non_negative("correctionRateUntilKeys", self.correction_rate_until_keys)?;
        ensure_non_negative("correctionRateAfterKeys", self.correction_rate_after_keys)?;
        if let Some(keys_amount) = self.keys_amount {
            ensure_non_negative("keysAmount", keys_amount)?;
        }

        if let Some(reinforcement) = &self.reinforcement {
            if let Some(amount) = reinforcement.amount {
                ensure_non_negative("reinforcement.amount", amount)?;
            }
            if reinforcement.enabled {
                if reinforcement.periodicity.is_none() {
                    return Err(FinancingError::validation(
                        "reinforcement.periodicity",
                        "is required when reinforcement is enabled",
                    ));
                }
                if reinforcement.amount.is_none() {
                    return Err(FinancingError::validation(
                        "reinforcement.amount",
                        "is required when reinforcement is enabled",
                    ));
                }
            }
        }

        if self.installment_mode == InstallmentMode::Custom {
            let installments = match &self.custom_installments {
                Some(installments) if !installments.is_empty() => installments,
                _ => {
                    return Err(FinancingError::validation(
                        "customInstallments",
                        "must not be empty when installmentMode is custom",
                    ));
                }
            };
            let mut seen = BTreeMap::new();
            for (index, installment) in installments.iter().enumerate() {
                if installment.month == 0 {
                    return Err(FinancingError::validation(
                        format!("customInstallments[{index}].month"),
                        "must be at least 1",
                    ));
                }
                ensure_positive(
                    &format!("customInstallments[{index}].amount"),
                    installment.amount,
                )?;
                if let Some(first) = seen.insert(installment.month, index) {
                    return Err(FinancingError::validation(
                        format!("customInstallments[{index}].month"),
                        format!(
                            "month {} is already scheduled by customInstallments[{first}]",
                            installment.month
                        ),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validates the terms and resolves the derived quantities.
    pub fn normalize(&self) -> Result<NormalizedInput> {
        self.validate()?;

        let effective_down_payment = self.effective_down_payment()?;
        let discount = self.discount.unwrap_or_default();
        // Both are non-negative and at most Decimal::MAX, so this cannot overflow.
        let initial_outstanding = self.property_value - effective_down_payment;
        let opening_net_balance = initial_outstanding
            .checked_sub(discount)
            .ok_or_else(|| FinancingError::out_of_range("discount"))?;
        let distribution = match self.installment_mode {
            InstallmentMode::Automatic => Distribution::Automatic {
                reinforcement: self.reinforcement.as_ref().and_then(|reinforcement| {
                    match (reinforcement.enabled, reinforcement.periodicity, reinforcement.amount) {
                        (true, Some(periodicity), Some(amount)) => {
                            Some(ReinforcementTerms { periodicity, amount })
                        }
                        _ => None,
                    }
                }),
                keys_amount: self.keys_amount.unwrap_or_default(),
            },
            InstallmentMode::Custom => Distribution::Custom(
                self.custom_installments
                    .iter()
                    .flatten()
                    .map(|installment| (installment.month, installment.clone()))
                    .collect(),
            ),
        };

        Ok(NormalizedInput {
            property_value: self.property_value,
            effective_down_payment,
            discount,
            initial_outstanding,
            delivery_term_months: self.delivery_term_months,
            payment_term_months: self.payment_term_months,
            correction_rate_until_keys: self.correction_rate_until_keys,
            correction_rate_after_keys: self.correction_rate_after_keys,
            opening_net_balance,
            distribution,
        })
    }
}
