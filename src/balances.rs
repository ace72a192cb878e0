// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recomputes every party's balance from raw records.
//!
//! This is the reference the incremental running totals are checked
//! against: [`accumulate`] folds a [`Snapshot`] into per-party balances and
//! [`reconcile`] reports where a stored total disagrees.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::error::LedgerResult;
use crate::ledger::{self, outstanding};
use crate::models::{
    BusinessSource, DailyAdvance, DailyExpense, Dealer, Farmer, HarvestingJob, Machine,
    MachineRental, Owner, Payment, PaymentStatus, PaymentType, RentalPayment,
};
use crate::store;
use crate::utils::money;

/// Narrows a report to one machine and/or one village.
///
/// The village is resolved through the farmer of a job and the dealer of a
/// rental. Filters are applied while loading, before any sum is taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    pub machine_id: Option<i64>,
    pub village: Option<String>,
}

impl ReportFilter {
    pub fn is_empty(&self) -> bool {
        self.machine_id.is_none() && self.village.is_none()
    }
}

/// Closed-world set of records a report is computed from.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub owners: Vec<Owner>,
    pub machines: Vec<Machine>,
    pub farmers: Vec<Farmer>,
    pub dealers: Vec<Dealer>,
    pub jobs: Vec<HarvestingJob>,
    pub rentals: Vec<MachineRental>,
    pub payments: Vec<Payment>,
    pub rental_payments: Vec<RentalPayment>,
    pub expenses: Vec<DailyExpense>,
    pub advances: Vec<DailyAdvance>,
}

impl Snapshot {
    pub fn load(conn: &Connection, filter: &ReportFilter) -> LedgerResult<Self> {
        let village = filter.village.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let jobs = store::list_jobs(conn, filter.machine_id, village)?;
        let rentals = store::list_rentals(conn, filter.machine_id, village)?;
        let mut snapshot = Snapshot {
            owners: store::list_owners(conn)?,
            machines: store::list_machines(conn)?,
            farmers: store::list_farmers(conn)?,
            dealers: store::list_dealers(conn)?,
            jobs,
            rentals,
            payments: store::list_payments(conn)?,
            rental_payments: store::list_rental_payments(conn)?,
            expenses: store::list_expenses(conn)?,
            advances: store::list_advances(conn)?,
        };
        if filter.machine_id.is_some() || village.is_some() {
            snapshot.retain_related(filter.machine_id, village);
        }
        tracing::debug!(
            jobs = snapshot.jobs.len(),
            rentals = snapshot.rentals.len(),
            payments = snapshot.payments.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Drops every record not reachable from the retained jobs and rentals.
    ///
    /// Payments follow their job when they name one, otherwise the farmer or
    /// owner they were made to. Owner-level payments cannot be split per
    /// machine and follow the owner as a whole.
    fn retain_related(&mut self, machine_id: Option<i64>, village: Option<&str>) {
        let in_village = |v: &Option<String>| match (village, v) {
            (None, _) => true,
            (Some(want), Some(have)) => have.trim().eq_ignore_ascii_case(want),
            (Some(_), None) => false,
        };

        let machines: HashSet<i64> = match machine_id {
            Some(id) => HashSet::from([id]),
            None => self
                .jobs
                .iter()
                .map(|j| j.machine_id)
                .chain(self.rentals.iter().map(|r| r.machine_id))
                .collect(),
        };
        let job_farmers: HashSet<i64> = self.jobs.iter().map(|j| j.farmer_id).collect();
        let rental_dealers: HashSet<i64> = self.rentals.iter().map(|r| r.dealer_id).collect();

        self.machines.retain(|m| machines.contains(&m.id));
        let owners: HashSet<i64> = self.machines.iter().map(|m| m.owner_id).collect();
        self.owners.retain(|o| owners.contains(&o.id));
        self.farmers.retain(|f| match machine_id {
            Some(_) => job_farmers.contains(&f.id) && in_village(&f.village),
            None => in_village(&f.village),
        });
        self.dealers.retain(|d| match machine_id {
            Some(_) => rental_dealers.contains(&d.id) && in_village(&d.village),
            None => in_village(&d.village),
        });

        let jobs: HashSet<i64> = self.jobs.iter().map(|j| j.id).collect();
        let farmers: HashSet<i64> = self.farmers.iter().map(|f| f.id).collect();
        self.payments.retain(|p| match (p.job_id, p.payment_type) {
            (Some(job_id), _) => jobs.contains(&job_id),
            (None, PaymentType::FromFarmer) => p.farmer_id.is_some_and(|id| farmers.contains(&id)),
            (None, PaymentType::ToMachineOwner) => {
                p.owner_id.is_some_and(|id| owners.contains(&id))
            }
        });

        let rentals: HashSet<i64> = self.rentals.iter().map(|r| r.id).collect();
        self.rental_payments.retain(|p| rentals.contains(&p.rental_id));
        self.expenses.retain(|e| machines.contains(&e.machine_id));
        self.advances.retain(|a| owners.contains(&a.owner_id));
    }

    pub fn machine(&self, id: i64) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }
}

/// What a party is owed (or owes) and how much of it is settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    #[serde(serialize_with = "money")]
    pub owed: Decimal,
    #[serde(serialize_with = "money")]
    pub paid: Decimal,
}

impl Balance {
    /// Unclamped difference; what the stored running total should hold.
    pub fn net(&self) -> Decimal {
        self.owed - self.paid
    }

    /// Amount still owed, floored at zero.
    pub fn pending(&self) -> Decimal {
        outstanding(self.owed, self.paid)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Balances {
    /// Harvesting obligations to owners.
    pub owners: BTreeMap<i64, Balance>,
    /// Rental obligations to owners, kept apart from harvesting.
    pub owner_rentals: BTreeMap<i64, Balance>,
    pub machines: BTreeMap<i64, Balance>,
    pub farmers: BTreeMap<i64, Balance>,
    pub dealers: BTreeMap<i64, Balance>,
    pub owner_advances: BTreeMap<i64, Decimal>,
}

pub fn accumulate(snapshot: &Snapshot) -> Balances {
    let mut out = Balances::default();
    for o in &snapshot.owners {
        out.owners.insert(o.id, Balance::default());
        out.owner_rentals.insert(o.id, Balance::default());
        out.owner_advances.insert(o.id, Decimal::ZERO);
    }
    for m in &snapshot.machines {
        out.machines.insert(m.id, Balance::default());
    }
    for f in &snapshot.farmers {
        out.farmers.insert(f.id, Balance::default());
    }
    for d in &snapshot.dealers {
        out.dealers.insert(d.id, Balance::default());
    }

    let owner_of: HashMap<i64, i64> = snapshot
        .machines
        .iter()
        .map(|m| (m.id, m.owner_id))
        .collect();
    let jobs: HashMap<i64, &HarvestingJob> = snapshot.jobs.iter().map(|j| (j.id, j)).collect();
    let rental_dealer: HashMap<i64, i64> = snapshot
        .rentals
        .iter()
        .map(|r| (r.id, r.dealer_id))
        .collect();

    for job in &snapshot.jobs {
        let owed_to_owner = ledger::net_owner_amount(job, job);
        out.machines.entry(job.machine_id).or_default().owed += owed_to_owner;
        if let Some(owner_id) = owner_of.get(&job.machine_id) {
            out.owners.entry(*owner_id).or_default().owed += owed_to_owner;
        }
        let farmer = out.farmers.entry(job.farmer_id).or_default();
        farmer.owed += ledger::net_farmer_amount(job);
        farmer.paid += job.advance_from_farmer;
    }

    for p in snapshot
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
    {
        let job = p.job_id.and_then(|id| jobs.get(&id));
        match p.payment_type {
            PaymentType::ToMachineOwner => {
                let owner_id = p
                    .owner_id
                    .or_else(|| job.and_then(|j| owner_of.get(&j.machine_id).copied()));
                let Some(owner_id) = owner_id else { continue };
                let bucket = match p.business_source {
                    BusinessSource::Harvesting => &mut out.owners,
                    BusinessSource::Rental => &mut out.owner_rentals,
                };
                bucket.entry(owner_id).or_default().paid += p.amount;
            }
            PaymentType::FromFarmer => {
                let farmer_id = p.farmer_id.or_else(|| job.map(|j| j.farmer_id));
                if let Some(farmer_id) = farmer_id {
                    out.farmers.entry(farmer_id).or_default().paid += p.amount;
                }
            }
        }
    }

    for e in &snapshot.expenses {
        out.machines.entry(e.machine_id).or_default().paid += e.amount;
        if let Some(owner_id) = owner_of.get(&e.machine_id) {
            out.owners.entry(*owner_id).or_default().paid += e.amount;
        }
    }

    for a in &snapshot.advances {
        *out.owner_advances.entry(a.owner_id).or_default() += a.amount;
    }

    for r in &snapshot.rentals {
        let dealer = out.dealers.entry(r.dealer_id).or_default();
        dealer.owed += r.total_amount_charged;
        dealer.paid += r.advance_paid;
        if let Some(owner_id) = owner_of.get(&r.machine_id) {
            out.owner_rentals.entry(*owner_id).or_default().owed += r.total_cost_to_owner;
        }
    }

    for p in snapshot
        .rental_payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
    {
        let dealer_id = rental_dealer.get(&p.rental_id).copied().unwrap_or(p.dealer_id);
        out.dealers.entry(dealer_id).or_default().paid += p.amount;
    }

    out
}

/// A stored cache disagreeing with its recomputed value. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyWarning {
    pub subject: String,
    pub field: &'static str,
    #[serde(serialize_with = "money")]
    pub stored: Decimal,
    #[serde(serialize_with = "money")]
    pub recomputed: Decimal,
}

impl ConsistencyWarning {
    pub fn new(
        subject: impl Into<String>,
        field: &'static str,
        stored: Decimal,
        recomputed: Decimal,
    ) -> Self {
        let warning = Self {
            subject: subject.into(),
            field,
            stored,
            recomputed,
        };
        tracing::warn!(
            subject = %warning.subject,
            field = warning.field,
            stored = %warning.stored,
            recomputed = %warning.recomputed,
            "consistency warning"
        );
        warning
    }
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: stored {} but recomputed {}",
            self.subject, self.field, self.stored, self.recomputed
        )
    }
}

struct Checker {
    epsilon: Decimal,
    found: Vec<ConsistencyWarning>,
}

impl Checker {
    fn check(&mut self, subject: &str, field: &'static str, stored: Decimal, recomputed: Decimal) {
        let within = stored
            .checked_sub(recomputed)
            .is_some_and(|diff| diff.abs() <= self.epsilon);
        if !within {
            self.found
                .push(ConsistencyWarning::new(subject, field, stored, recomputed));
        }
    }
}

/// Compares every stored running total and cached amount against `balances`.
///
/// Only meaningful for an unfiltered snapshot: a filtered one deliberately
/// omits records the stored totals include.
pub fn reconcile(
    snapshot: &Snapshot,
    balances: &Balances,
    epsilon: Decimal,
) -> Vec<ConsistencyWarning> {
    let mut c = Checker {
        epsilon,
        found: Vec::new(),
    };
    let zero = Balance::default();

    for o in &snapshot.owners {
        let subject = format!("owner {} ({})", o.id, o.name);
        let b = balances.owners.get(&o.id).unwrap_or(&zero);
        c.check(&subject, "total_amount_pending", o.total_amount_pending, b.net());
        c.check(&subject, "total_amount_paid", o.total_amount_paid, b.paid);
        let r = balances.owner_rentals.get(&o.id).unwrap_or(&zero);
        c.check(&subject, "rental_amount_pending", o.rental_amount_pending, r.net());
        c.check(&subject, "rental_amount_paid", o.rental_amount_paid, r.paid);
        let advances = balances
            .owner_advances
            .get(&o.id)
            .copied()
            .unwrap_or_default();
        c.check(&subject, "total_advances_given", o.total_advances_given, advances);
    }
    for m in &snapshot.machines {
        let subject = format!("machine {} ({})", m.id, m.name);
        let b = balances.machines.get(&m.id).unwrap_or(&zero);
        c.check(&subject, "total_amount_pending", m.total_amount_pending, b.net());
    }
    for f in &snapshot.farmers {
        let subject = format!("farmer {} ({})", f.id, f.name);
        let b = balances.farmers.get(&f.id).unwrap_or(&zero);
        c.check(&subject, "total_amount_pending", f.total_amount_pending, b.net());
        c.check(&subject, "total_amount_paid", f.total_amount_paid, b.paid);
    }
    for d in &snapshot.dealers {
        let subject = format!("dealer {} ({})", d.id, d.name);
        let b = balances.dealers.get(&d.id).unwrap_or(&zero);
        c.check(&subject, "total_amount_pending", d.total_amount_pending, b.net());
        c.check(&subject, "total_amount_paid", d.total_amount_paid, b.paid);
    }
    for j in &snapshot.jobs {
        let subject = format!("job {}", j.id);
        c.check(
            &subject,
            "net_owner_amount",
            j.net_owner_amount,
            ledger::net_owner_amount(j, j),
        );
        c.check(
            &subject,
            "net_amount_from_farmer",
            j.net_amount_from_farmer,
            ledger::net_farmer_amount(j),
        );
    }
    for r in &snapshot.rentals {
        let subject = format!("rental {}", r.id);
        c.check(&subject, "profit_margin", r.profit_margin, ledger::rental_profit(r));
        c.check(
            &subject,
            "total_amount_charged",
            r.total_amount_charged,
            ledger::rental_charge(r.total_hours_used, r.hourly_rate_to_dealer),
        );
        c.check(
            &subject,
            "total_cost_to_owner",
            r.total_cost_to_owner,
            ledger::rental_owner_cost(r.total_hours_used, r.hourly_cost_from_owner),
        );
    }
    c.found
}
