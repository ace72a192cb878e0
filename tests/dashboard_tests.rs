// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use harvestledger::balances::ReportFilter;
use harvestledger::commands::dashboard::get_dashboard;
use harvestledger::commands::jobs::{self, NewJob};
use harvestledger::commands::payments::{self, NewPayment};
use harvestledger::commands::rentals::{self, NewRental, NewRentalPayment};
use harvestledger::commands::{expenses, machines, owners, parties};
use harvestledger::db;
use harvestledger::models::{BusinessSource, PaymentStatus, PaymentType};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, n).unwrap()
}

fn eps() -> Decimal {
    d("0.01")
}

fn empty_db() -> Connection {
    harvestledger::logging::init_test();
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn job(farmer: i64, machine: i64, date: NaiveDate, hours: &str) -> NewJob {
    NewJob {
        farmer_id: farmer,
        machine_id: machine,
        date,
        hours: d(hours),
        rate_per_hour: None,
        total_amount: None,
        advance_from_farmer: Decimal::ZERO,
        discount_to_farmer: Decimal::ZERO,
        discount_from_owner: Decimal::ZERO,
        note: None,
    }
}

fn farmer_payment(farmer: i64, job: Option<i64>, amount: &str) -> NewPayment {
    NewPayment {
        payment_type: PaymentType::FromFarmer,
        business_source: BusinessSource::Harvesting,
        owner_id: None,
        farmer_id: Some(farmer),
        job_id: job,
        date: day(20),
        gross_amount: d(amount),
        discount_amount: Decimal::ZERO,
        status: PaymentStatus::Completed,
        note: None,
    }
}

#[test]
fn empty_dataset_is_all_zero() {
    let conn = empty_db();
    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    assert_eq!(r.counts.jobs, 0);
    assert_eq!(r.counts.completed_jobs, 0);
    assert_eq!(r.counts.owners, 0);
    assert_eq!(r.harvesting.total_revenue, Decimal::ZERO);
    assert_eq!(r.harvesting.profit, Decimal::ZERO);
    assert_eq!(r.harvesting.pending_from_farmers, Decimal::ZERO);
    assert_eq!(r.dealer_rentals.total_profit, Decimal::ZERO);
    assert_eq!(r.combined.total_hours, Decimal::ZERO);
    assert!(r.owner_balances.is_empty());
    assert!(r.farmer_balances.is_empty());
    assert!(r.dealer_balances.is_empty());
    assert!(r.warnings.is_empty());

    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["harvesting"]["totalRevenue"], "0.00");
    assert_eq!(json["dealerRentals"]["pendingFromDealers"], "0.00");
}

#[test]
fn owner_without_jobs_is_tolerated() {
    let conn = empty_db();
    let owner = owners::create_owner(&conn, "Idle", None, d("800")).unwrap();
    machines::create_machine(&conn, owner.id, "Spare", None, d("1200"), None).unwrap();
    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    assert_eq!(r.counts.machines, 1);
    assert_eq!(r.owner_balances.len(), 1);
    assert_eq!(r.owner_balances[0].pending, Decimal::ZERO);
}

#[test]
fn owner_payments_and_expenses_reduce_pending() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m = machines::create_machine(&conn, owner.id, "C1", None, d("1500"), None).unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", Some("Rampur"), None).unwrap();
    jobs::create_job(&mut conn, job(farmer.id, m.id, day(1), "10")).unwrap();
    payments::create_payment(
        &mut conn,
        NewPayment {
            payment_type: PaymentType::ToMachineOwner,
            business_source: BusinessSource::Harvesting,
            owner_id: Some(owner.id),
            farmer_id: None,
            job_id: None,
            date: day(2),
            gross_amount: d("4000"),
            discount_amount: Decimal::ZERO,
            status: PaymentStatus::Completed,
            note: None,
        },
    )
    .unwrap();
    expenses::create_expense(&mut conn, m.id, day(2), d("1000"), Some("diesel".into())).unwrap();

    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    let h = &r.harvesting;
    assert_eq!(h.total_revenue, d("15000"));
    assert_eq!(h.total_hours, d("10"));
    assert_eq!(h.total_to_pay_to_owners, d("10000"));
    assert_eq!(h.total_paid_to_owners, d("5000"));
    assert_eq!(h.pending_to_owners, d("5000"));
    assert_eq!(h.pending_from_farmers, d("15000"));
    assert_eq!(h.profit, d("5000"));
    assert!(r.warnings.is_empty());
}

#[test]
fn overpaid_owner_reports_zero_pending() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m = machines::create_machine(&conn, owner.id, "C1", None, d("1500"), None).unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", None, None).unwrap();
    jobs::create_job(&mut conn, job(farmer.id, m.id, day(1), "1")).unwrap();
    expenses::create_expense(&mut conn, m.id, day(2), d("1500"), None).unwrap();

    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    assert_eq!(r.harvesting.pending_to_owners, Decimal::ZERO);
    assert_eq!(r.owner_balances[0].pending, Decimal::ZERO);
    assert!(r.warnings.is_empty());
}

#[test]
fn rentals_and_combined_sections() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m = machines::create_machine(&conn, owner.id, "C1", None, d("1500"), None).unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", None, None).unwrap();
    let dealer = parties::create_dealer(&conn, "Agro", None, None).unwrap();
    jobs::create_job(&mut conn, job(farmer.id, m.id, day(1), "10")).unwrap();
    let rental = rentals::create_rental(
        &mut conn,
        NewRental {
            dealer_id: dealer.id,
            machine_id: m.id,
            start_date: day(3),
            total_hours_used: d("20"),
            hourly_rate_to_dealer: Some(d("1200")),
            hourly_cost_from_owner: Some(d("800")),
            advance_paid: d("4000"),
        },
    )
    .unwrap();
    rentals::create_rental_payment(
        &mut conn,
        NewRentalPayment {
            rental_id: rental.id,
            date: day(5),
            amount: d("6000"),
            status: PaymentStatus::Completed,
            note: None,
        },
    )
    .unwrap();

    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    let dr = &r.dealer_rentals;
    assert_eq!(dr.total_revenue, d("24000"));
    assert_eq!(dr.total_hours, d("20"));
    assert_eq!(dr.total_owner_cost, d("16000"));
    assert_eq!(dr.total_profit, d("8000"));
    assert_eq!(dr.total_paid_by_dealers, d("10000"));
    assert_eq!(dr.pending_from_dealers, d("14000"));
    assert_eq!(dr.pending_to_owners, d("16000"));
    assert_eq!(r.counts.active_rentals, 1);

    assert_eq!(r.combined.total_revenue, d("39000"));
    assert_eq!(r.combined.total_hours, d("30"));
    assert_eq!(r.combined.total_profit, d("13000"));
    // the rental bucket does not leak into harvesting
    assert_eq!(r.harvesting.pending_to_owners, d("10000"));
    assert!(r.warnings.is_empty());
}

#[test]
fn job_completion_uses_direct_then_oldest_first_payments() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m = machines::create_machine(&conn, owner.id, "C1", None, d("1000"), None).unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", None, None).unwrap();
    // three jobs of 1000 each
    let newest = jobs::create_job(&mut conn, job(farmer.id, m.id, day(9), "1")).unwrap();
    jobs::create_job(&mut conn, job(farmer.id, m.id, day(1), "1")).unwrap();
    jobs::create_job(&mut conn, job(farmer.id, m.id, day(5), "1")).unwrap();

    payments::create_payment(&mut conn, farmer_payment(farmer.id, Some(newest.id), "1000"))
        .unwrap();
    payments::create_payment(&mut conn, farmer_payment(farmer.id, None, "1500")).unwrap();

    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    // newest paid directly, day 1 covered by the pool, day 5 only half
    assert_eq!(r.counts.completed_jobs, 2);
    assert_eq!(r.counts.pending_jobs, 1);
}

#[test]
fn advance_alone_can_complete_a_job() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m = machines::create_machine(&conn, owner.id, "C1", None, d("1000"), None).unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", None, None).unwrap();
    let mut input = job(farmer.id, m.id, day(1), "2");
    input.advance_from_farmer = d("2000");
    jobs::create_job(&mut conn, input).unwrap();

    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    assert_eq!(r.counts.completed_jobs, 1);
    assert_eq!(r.harvesting.pending_from_farmers, Decimal::ZERO);
}

#[test]
fn filters_apply_before_aggregation() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m1 = machines::create_machine(&conn, owner.id, "C1", None, d("1500"), None).unwrap();
    let m2 = machines::create_machine(&conn, owner.id, "C2", None, d("1500"), None).unwrap();
    let rampur = parties::create_farmer(&conn, "Ramesh", Some("Rampur"), None).unwrap();
    let kheri = parties::create_farmer(&conn, "Suresh", Some("Kheri"), None).unwrap();
    jobs::create_job(&mut conn, job(rampur.id, m1.id, day(1), "10")).unwrap();
    jobs::create_job(&mut conn, job(kheri.id, m2.id, day(1), "4")).unwrap();
    payments::create_payment(&mut conn, farmer_payment(kheri.id, None, "1000")).unwrap();

    let by_machine = get_dashboard(
        &conn,
        &ReportFilter {
            machine_id: Some(m2.id),
            village: None,
        },
        eps(),
    )
    .unwrap();
    assert_eq!(by_machine.counts.jobs, 1);
    assert_eq!(by_machine.harvesting.total_revenue, d("6000"));
    assert_eq!(by_machine.harvesting.pending_from_farmers, d("5000"));
    assert_eq!(by_machine.farmer_balances.len(), 1);
    assert!(by_machine.warnings.is_empty());

    let by_village = get_dashboard(
        &conn,
        &ReportFilter {
            machine_id: None,
            village: Some("RAMPUR".into()),
        },
        eps(),
    )
    .unwrap();
    assert_eq!(by_village.counts.jobs, 1);
    assert_eq!(by_village.harvesting.total_hours, d("10"));
    assert_eq!(by_village.harvesting.pending_from_farmers, d("15000"));
    assert_eq!(by_village.counts.farmers, 1);
}

#[test]
fn drifted_running_total_is_warned_not_fixed() {
    let mut conn = empty_db();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    let m = machines::create_machine(&conn, owner.id, "C1", None, d("1500"), None).unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", None, None).unwrap();
    jobs::create_job(&mut conn, job(farmer.id, m.id, day(1), "10")).unwrap();
    conn.execute(
        "UPDATE owners SET total_amount_pending='9000' WHERE id=?1",
        [owner.id],
    )
    .unwrap();

    let r = get_dashboard(&conn, &ReportFilter::default(), eps()).unwrap();
    assert_eq!(r.warnings.len(), 1);
    assert_eq!(r.warnings[0].stored, d("9000"));
    assert_eq!(r.warnings[0].recomputed, d("10000"));
    // reports use the recomputed figure
    assert_eq!(r.harvesting.pending_to_owners, d("10000"));

    let stored: String = conn
        .query_row(
            "SELECT total_amount_pending FROM owners WHERE id=?1",
            [owner.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(stored, "9000");
}
