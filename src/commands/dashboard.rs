// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::balances::{self, Balance, Balances, ConsistencyWarning, ReportFilter, Snapshot};
use crate::error::LedgerResult;
use crate::ledger;
use crate::models::{HarvestingJob, PaymentStatus, PaymentType, RentalStatus};
use crate::utils::{fmt_money, get_currency, get_epsilon, money, opt_text_arg, pretty_table};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub owners: usize,
    pub machines: usize,
    pub farmers: usize,
    pub dealers: usize,
    pub jobs: usize,
    pub completed_jobs: usize,
    pub pending_jobs: usize,
    pub rentals: usize,
    pub active_rentals: usize,
    pub completed_rentals: usize,
    pub payments: usize,
    pub rental_payments: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestingSummary {
    #[serde(serialize_with = "money")]
    pub total_revenue: Decimal,
    pub total_hours: Decimal,
    #[serde(serialize_with = "money")]
    pub total_paid_to_owners: Decimal,
    #[serde(serialize_with = "money")]
    pub total_to_pay_to_owners: Decimal,
    #[serde(serialize_with = "money")]
    pub pending_to_owners: Decimal,
    #[serde(serialize_with = "money")]
    pub pending_from_farmers: Decimal,
    #[serde(serialize_with = "money")]
    pub profit: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalSummary {
    #[serde(serialize_with = "money")]
    pub total_revenue: Decimal,
    pub total_hours: Decimal,
    #[serde(serialize_with = "money")]
    pub total_owner_cost: Decimal,
    #[serde(serialize_with = "money")]
    pub total_profit: Decimal,
    #[serde(serialize_with = "money")]
    pub total_paid_by_dealers: Decimal,
    #[serde(serialize_with = "money")]
    pub pending_from_dealers: Decimal,
    #[serde(serialize_with = "money")]
    pub pending_to_owners: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSummary {
    #[serde(serialize_with = "money")]
    pub total_revenue: Decimal,
    pub total_hours: Decimal,
    #[serde(serialize_with = "money")]
    pub total_profit: Decimal,
}

/// One party's recomputed balance, pending floored at zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyBalance {
    pub id: i64,
    pub name: String,
    #[serde(serialize_with = "money")]
    pub owed: Decimal,
    #[serde(serialize_with = "money")]
    pub paid: Decimal,
    #[serde(serialize_with = "money")]
    pub pending: Decimal,
}

impl PartyBalance {
    fn new(id: i64, name: &str, b: Balance) -> Self {
        Self {
            id,
            name: name.to_string(),
            owed: b.owed,
            paid: b.paid,
            pending: b.pending(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub filter: ReportFilter,
    pub counts: Counts,
    pub harvesting: HarvestingSummary,
    pub dealer_rentals: RentalSummary,
    pub combined: CombinedSummary,
    pub owner_balances: Vec<PartyBalance>,
    pub owner_rental_balances: Vec<PartyBalance>,
    pub farmer_balances: Vec<PartyBalance>,
    pub dealer_balances: Vec<PartyBalance>,
    /// Empty for filtered reports.
    pub warnings: Vec<ConsistencyWarning>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let filter = ReportFilter {
        machine_id: m.get_one::<i64>("machine").copied(),
        village: opt_text_arg(m, "village"),
    };
    let epsilon = get_epsilon(conn)?;
    let report = get_dashboard(conn, &filter, epsilon)?;
    if m.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report, &get_currency(conn)?);
    Ok(())
}

/// Builds the full dashboard for the records selected by `filter`.
///
/// Sums are recomputed from raw records; stored running totals are only
/// compared against them, and only when no filter narrows the snapshot.
pub fn get_dashboard(
    conn: &Connection,
    filter: &ReportFilter,
    epsilon: Decimal,
) -> LedgerResult<DashboardReport> {
    let snapshot = Snapshot::load(conn, filter)?;
    let balances = balances::accumulate(&snapshot);
    let mut report = summarize(&snapshot, &balances);
    report.filter = filter.clone();
    if filter.is_empty() {
        report.warnings = balances::reconcile(&snapshot, &balances, epsilon);
    }
    Ok(report)
}

/// Pure composition over an already loaded snapshot.
pub fn summarize(snapshot: &Snapshot, balances: &Balances) -> DashboardReport {
    let (completed_jobs, pending_jobs) = classify_jobs(snapshot);
    let counts = Counts {
        owners: snapshot.owners.len(),
        machines: snapshot.machines.len(),
        farmers: snapshot.farmers.len(),
        dealers: snapshot.dealers.len(),
        jobs: snapshot.jobs.len(),
        completed_jobs,
        pending_jobs,
        rentals: snapshot.rentals.len(),
        active_rentals: snapshot
            .rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Active)
            .count(),
        completed_rentals: snapshot
            .rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Completed)
            .count(),
        payments: snapshot.payments.len(),
        rental_payments: snapshot.rental_payments.len(),
    };

    let mut harvesting = HarvestingSummary::default();
    for job in &snapshot.jobs {
        harvesting.total_revenue += ledger::gross_farmer_amount(job);
        harvesting.total_hours += job.hours;
        harvesting.total_to_pay_to_owners += ledger::net_owner_amount(job, job);
    }
    for b in balances.owners.values() {
        harvesting.total_paid_to_owners += b.paid;
        harvesting.pending_to_owners += b.pending();
    }
    harvesting.pending_from_farmers = balances.farmers.values().map(Balance::pending).sum();
    harvesting.profit = harvesting.total_revenue - harvesting.total_to_pay_to_owners;

    let mut rentals = RentalSummary::default();
    for r in &snapshot.rentals {
        rentals.total_revenue += r.total_amount_charged;
        rentals.total_hours += r.total_hours_used;
        rentals.total_owner_cost += r.total_cost_to_owner;
        rentals.total_profit += ledger::rental_profit(r);
    }
    for b in balances.dealers.values() {
        rentals.total_paid_by_dealers += b.paid;
        rentals.pending_from_dealers += b.pending();
    }
    rentals.pending_to_owners = balances.owner_rentals.values().map(Balance::pending).sum();

    let combined = CombinedSummary {
        total_revenue: harvesting.total_revenue + rentals.total_revenue,
        total_hours: harvesting.total_hours + rentals.total_hours,
        total_profit: harvesting.profit + rentals.total_profit,
    };

    let owner_name: HashMap<i64, &str> = snapshot
        .owners
        .iter()
        .map(|o| (o.id, o.name.as_str()))
        .collect();
    let farmer_name: HashMap<i64, &str> = snapshot
        .farmers
        .iter()
        .map(|f| (f.id, f.name.as_str()))
        .collect();
    let dealer_name: HashMap<i64, &str> = snapshot
        .dealers
        .iter()
        .map(|d| (d.id, d.name.as_str()))
        .collect();

    DashboardReport {
        filter: ReportFilter::default(),
        counts,
        harvesting,
        dealer_rentals: rentals,
        combined,
        owner_balances: party_list(&balances.owners, &owner_name),
        owner_rental_balances: party_list(&balances.owner_rentals, &owner_name),
        farmer_balances: party_list(&balances.farmers, &farmer_name),
        dealer_balances: party_list(&balances.dealers, &dealer_name),
        warnings: Vec::new(),
    }
}

pub fn party_list(map: &BTreeMap<i64, Balance>, names: &HashMap<i64, &str>) -> Vec<PartyBalance> {
    map.iter()
        .map(|(id, b)| PartyBalance::new(*id, names.get(id).copied().unwrap_or(""), *b))
        .collect()
}

/// Splits jobs into (completed, pending).
///
/// A job is completed once its advance plus the farmer payments matched to
/// it reach its gross amount. Payments naming the job match it directly;
/// the farmer's unattributed payments then fill the remaining shortfalls
/// oldest job first.
pub fn classify_jobs(snapshot: &Snapshot) -> (usize, usize) {
    let mut covered: HashMap<i64, Decimal> = snapshot
        .jobs
        .iter()
        .map(|j| (j.id, j.advance_from_farmer))
        .collect();
    let mut unattributed: HashMap<i64, Decimal> = HashMap::new();

    for p in snapshot.payments.iter().filter(|p| {
        p.payment_type == PaymentType::FromFarmer && p.status == PaymentStatus::Completed
    }) {
        match p.job_id.and_then(|id| covered.get_mut(&id)) {
            Some(c) => *c += p.amount,
            None => {
                if let Some(farmer_id) = p.farmer_id {
                    *unattributed.entry(farmer_id).or_default() += p.amount;
                }
            }
        }
    }

    let mut jobs: Vec<&HarvestingJob> = snapshot.jobs.iter().collect();
    jobs.sort_by_key(|j| (j.date, j.id));

    let mut completed = 0;
    for job in &jobs {
        let gross = ledger::gross_farmer_amount(job);
        let have = covered.get(&job.id).copied().unwrap_or_default();
        let mut shortfall = gross - have;
        if shortfall > Decimal::ZERO {
            if let Some(pool) = unattributed.get_mut(&job.farmer_id) {
                let used = (*pool).min(shortfall);
                *pool -= used;
                shortfall -= used;
            }
        }
        if shortfall <= Decimal::ZERO {
            completed += 1;
        }
    }
    (completed, jobs.len() - completed)
}

fn line(label: &str, harvesting: String, rentals: String, combined: String) -> Vec<String> {
    vec![label.to_string(), harvesting, rentals, combined]
}

fn print_report(r: &DashboardReport, ccy: &str) {
    let c = &r.counts;
    println!(
        "{}",
        pretty_table(
            &[
                "Owners",
                "Machines",
                "Farmers",
                "Dealers",
                "Jobs (done/pending)",
                "Rentals (active/done)",
            ],
            vec![vec![
                c.owners.to_string(),
                c.machines.to_string(),
                c.farmers.to_string(),
                c.dealers.to_string(),
                format!("{} ({}/{})", c.jobs, c.completed_jobs, c.pending_jobs),
                format!("{} ({}/{})", c.rentals, c.active_rentals, c.completed_rentals),
            ]],
        )
    );

    let h = &r.harvesting;
    let d = &r.dealer_rentals;
    let m = |v: &Decimal| fmt_money(v, ccy);
    let rows = vec![
        line("Revenue", m(&h.total_revenue), m(&d.total_revenue), m(&r.combined.total_revenue)),
        line(
            "Hours",
            h.total_hours.to_string(),
            d.total_hours.to_string(),
            r.combined.total_hours.to_string(),
        ),
        line("Owed to owners", m(&h.total_to_pay_to_owners), m(&d.total_owner_cost), String::new()),
        line("Paid to owners", m(&h.total_paid_to_owners), String::new(), String::new()),
        line("Pending to owners", m(&h.pending_to_owners), m(&d.pending_to_owners), String::new()),
        line("Paid by dealers", String::new(), m(&d.total_paid_by_dealers), String::new()),
        line(
            "Pending from customers",
            m(&h.pending_from_farmers),
            m(&d.pending_from_dealers),
            String::new(),
        ),
        line("Profit", m(&h.profit), m(&d.total_profit), m(&r.combined.total_profit)),
    ];
    println!(
        "{}",
        pretty_table(&["", "Harvesting", "Dealer rentals", "Combined"], rows)
    );

    if !r.warnings.is_empty() {
        let rows = r
            .warnings
            .iter()
            .map(|w| {
                vec![
                    w.subject.clone(),
                    w.field.to_string(),
                    fmt_money(&w.stored, ccy),
                    fmt_money(&w.recomputed, ccy),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Subject", "Field", "Stored", "Recomputed"], rows)
        );
    }
}
