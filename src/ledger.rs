// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure money arithmetic over single records. No I/O.
//!
//! Amounts stay at full `Decimal` precision here; rounding to two places
//! happens only when a figure is printed.

use rust_decimal::Decimal;
use std::ops::{Add, AddAssign, Neg};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    DailyExpense, HarvestingJob, Machine, MachineRental, Payment, PaymentStatus, RentalPayment,
};

/// Anything that can quote the owner's hourly rate for a job.
///
/// A [`Machine`] quotes its current negotiated rate; a stored
/// [`HarvestingJob`] quotes the rate frozen on it at booking time.
pub trait OwnerRate {
    fn owner_rate_per_hour(&self) -> Decimal;
}

impl OwnerRate for Machine {
    fn owner_rate_per_hour(&self) -> Decimal {
        self.owner_rate_per_hour
    }
}

impl OwnerRate for HarvestingJob {
    fn owner_rate_per_hour(&self) -> Decimal {
        self.owner_rate_per_hour
    }
}

impl OwnerRate for Decimal {
    fn owner_rate_per_hour(&self) -> Decimal {
        *self
    }
}

pub fn clamp_discount(discount: Decimal, gross: Decimal) -> Decimal {
    discount.max(Decimal::ZERO).min(gross.max(Decimal::ZERO))
}

pub fn gross_farmer_amount(job: &HarvestingJob) -> Decimal {
    match job.total_amount {
        Some(total) if total > Decimal::ZERO => total,
        _ => job.hours * job.rate_per_hour,
    }
}

pub fn net_farmer_amount(job: &HarvestingJob) -> Decimal {
    let gross = gross_farmer_amount(job);
    gross - clamp_discount(job.discount_to_farmer, gross)
}

pub fn gross_owner_amount(job: &HarvestingJob, rate: &impl OwnerRate) -> Decimal {
    job.hours * rate.owner_rate_per_hour()
}

pub fn net_owner_amount(job: &HarvestingJob, rate: &impl OwnerRate) -> Decimal {
    let gross = gross_owner_amount(job, rate);
    gross - clamp_discount(job.discount_from_owner, gross)
}

/// Profit of a rental, always from the formula. `profit_margin` is ignored.
pub fn rental_profit(rental: &MachineRental) -> Decimal {
    rental.total_amount_charged - rental.total_cost_to_owner
}

pub fn rental_charge(hours: Decimal, hourly_rate_to_dealer: Decimal) -> Decimal {
    hours * hourly_rate_to_dealer
}

pub fn rental_owner_cost(hours: Decimal, hourly_cost_from_owner: Decimal) -> Decimal {
    hours * hourly_cost_from_owner
}

/// `net = gross - discount`, rejecting a discount outside `0..=gross`.
pub fn net_payment_amount(gross: Decimal, discount: Decimal) -> LedgerResult<Decimal> {
    ensure_amount("gross_amount", gross)?;
    ensure_discount("discount_amount", discount, gross)?;
    Ok(gross - discount)
}

/// Largest money value accepted on input: rates, amounts, advances.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;
/// Largest hour count accepted on a job or rental.
pub const MAX_HOURS: i64 = 100_000;

fn ensure_within(field: &str, value: Decimal, max: i64) -> LedgerResult<()> {
    if value < Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{} must not be negative (got {})",
            field, value
        )));
    }
    if value > Decimal::from(max) {
        return Err(LedgerError::validation(format!(
            "{} {} exceeds the limit of {}",
            field, value, max
        )));
    }
    Ok(())
}

/// `0 <= value <= MAX_AMOUNT`. The bound keeps every product and running
/// total far inside `Decimal`'s range.
pub fn ensure_amount(field: &str, value: Decimal) -> LedgerResult<()> {
    ensure_within(field, value, MAX_AMOUNT)
}

pub fn ensure_hours(field: &str, value: Decimal) -> LedgerResult<()> {
    ensure_within(field, value, MAX_HOURS)
}

pub fn ensure_discount(field: &str, discount: Decimal, gross: Decimal) -> LedgerResult<()> {
    ensure_amount(field, discount)?;
    if discount > gross {
        return Err(LedgerError::validation(format!(
            "{} {} exceeds gross amount {}",
            field, discount, gross
        )));
    }
    Ok(())
}

/// Bounds-checks a job's amounts and discounts against the rate it will be
/// priced at.
pub fn validate_job(job: &HarvestingJob, rate: &impl OwnerRate) -> LedgerResult<()> {
    ensure_hours("hours", job.hours)?;
    ensure_amount("rate_per_hour", job.rate_per_hour)?;
    ensure_amount("owner_rate_per_hour", rate.owner_rate_per_hour())?;
    ensure_amount("advance_from_farmer", job.advance_from_farmer)?;
    if let Some(total) = job.total_amount {
        ensure_amount("total_amount", total)?;
    }
    ensure_discount(
        "discount_to_farmer",
        job.discount_to_farmer,
        gross_farmer_amount(job),
    )?;
    ensure_discount(
        "discount_from_owner",
        job.discount_from_owner,
        gross_owner_amount(job, rate),
    )?;
    Ok(())
}

/// Freezes the owner rate and both net amounts onto the job.
pub fn price_job(job: &mut HarvestingJob, rate: &impl OwnerRate) {
    let frozen = rate.owner_rate_per_hour();
    job.owner_rate_per_hour = frozen;
    job.net_amount_from_farmer = net_farmer_amount(job);
    job.net_owner_amount = net_owner_amount(job, &frozen);
}

/// Change to a party's `(pending, paid)` running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delta {
    pub pending: Decimal,
    pub paid: Decimal,
}

impl Delta {
    pub const ZERO: Delta = Delta {
        pending: Decimal::ZERO,
        paid: Decimal::ZERO,
    };

    pub fn owed(amount: Decimal) -> Self {
        Self {
            pending: amount,
            paid: Decimal::ZERO,
        }
    }

    pub fn settled(amount: Decimal) -> Self {
        Self {
            pending: -amount,
            paid: amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.pending.is_zero() && self.paid.is_zero()
    }
}

impl Neg for Delta {
    type Output = Delta;

    fn neg(self) -> Delta {
        Delta {
            pending: -self.pending,
            paid: -self.paid,
        }
    }
}

impl Add for Delta {
    type Output = Delta;

    fn add(self, rhs: Delta) -> Delta {
        Delta {
            pending: self.pending + rhs.pending,
            paid: self.paid + rhs.paid,
        }
    }
}

impl AddAssign for Delta {
    fn add_assign(&mut self, rhs: Delta) {
        self.pending += rhs.pending;
        self.paid += rhs.paid;
    }
}

/// Running-total changes caused by one harvesting job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobDeltas {
    pub machine_pending: Decimal,
    pub owner: Delta,
    pub farmer: Delta,
}

impl Neg for JobDeltas {
    type Output = JobDeltas;

    fn neg(self) -> JobDeltas {
        JobDeltas {
            machine_pending: -self.machine_pending,
            owner: -self.owner,
            farmer: -self.farmer,
        }
    }
}

/// Deltas from the amounts frozen on a priced job. Deleting the job applies
/// the negation, so a create/delete pair cancels exactly.
pub fn job_deltas(job: &HarvestingJob) -> JobDeltas {
    JobDeltas {
        machine_pending: job.net_owner_amount,
        owner: Delta::owed(job.net_owner_amount),
        farmer: Delta {
            pending: job.net_amount_from_farmer - job.advance_from_farmer,
            paid: job.advance_from_farmer,
        },
    }
}

/// Only completed payments move running totals.
pub fn payment_delta(payment: &Payment) -> Delta {
    match payment.status {
        PaymentStatus::Completed => Delta::settled(payment.amount),
        PaymentStatus::Pending => Delta::ZERO,
    }
}

pub fn rental_payment_delta(payment: &RentalPayment) -> Delta {
    match payment.status {
        PaymentStatus::Completed => Delta::settled(payment.amount),
        PaymentStatus::Pending => Delta::ZERO,
    }
}

/// An expense is money already delivered to the machine's owner.
pub fn expense_delta(expense: &DailyExpense) -> Delta {
    Delta::settled(expense.amount)
}

/// Running-total changes caused by one rental.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RentalDeltas {
    pub dealer: Delta,
    pub owner_rental: Delta,
}

impl Neg for RentalDeltas {
    type Output = RentalDeltas;

    fn neg(self) -> RentalDeltas {
        RentalDeltas {
            dealer: -self.dealer,
            owner_rental: -self.owner_rental,
        }
    }
}

pub fn rental_deltas(rental: &MachineRental) -> RentalDeltas {
    RentalDeltas {
        dealer: Delta {
            pending: rental.total_amount_charged - rental.advance_paid,
            paid: rental.advance_paid,
        },
        owner_rental: Delta::owed(rental.total_cost_to_owner),
    }
}

/// Pending as shown to people: never below zero.
pub fn outstanding(owed: Decimal, paid: Decimal) -> Decimal {
    (owed - paid).max(Decimal::ZERO)
}
