// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use harvestledger::commands::rentals::{self, NewRental, NewRentalPayment, RentalPatch};
use harvestledger::commands::{doctor, machines, owners, parties};
use harvestledger::models::{PaymentStatus, RentalStatus};
use harvestledger::{db, store};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, n).unwrap()
}

struct Fixture {
    conn: Connection,
    owner: i64,
    machine: i64,
    dealer: i64,
}

fn setup() -> Fixture {
    harvestledger::logging::init_test();
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("600")).unwrap();
    let machine =
        machines::create_machine(&conn, owner.id, "Combine 2", None, d("1000"), None).unwrap();
    let dealer = parties::create_dealer(&conn, "Agro Traders", Some("Kheri"), None).unwrap();
    Fixture {
        conn,
        owner: owner.id,
        machine: machine.id,
        dealer: dealer.id,
    }
}

fn new_rental(dealer: i64, machine: i64, hours: &str, advance: &str) -> NewRental {
    NewRental {
        dealer_id: dealer,
        machine_id: machine,
        start_date: day(1),
        total_hours_used: d(hours),
        hourly_rate_to_dealer: None,
        hourly_cost_from_owner: None,
        advance_paid: d(advance),
    }
}

fn dealer_totals(f: &Fixture) -> (Decimal, Decimal) {
    let dl = store::get_dealer(&f.conn, f.dealer).unwrap();
    (dl.total_amount_pending, dl.total_amount_paid)
}

#[test]
fn rental_prices_from_machine_rates() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "20", "5000"))
        .unwrap();
    assert_eq!(r.hourly_rate_to_dealer, d("1000"));
    assert_eq!(r.hourly_cost_from_owner, d("600"));
    assert_eq!(r.total_amount_charged, d("20000"));
    assert_eq!(r.total_cost_to_owner, d("12000"));
    assert_eq!(r.profit_margin, d("8000"));
    assert_eq!(r.status, RentalStatus::Active);

    assert_eq!(dealer_totals(&f), (d("15000"), d("5000")));
    let o = store::get_owner(&f.conn, f.owner).unwrap();
    assert_eq!(o.rental_amount_pending, d("12000"));
    // harvesting bucket is untouched
    assert_eq!(o.total_amount_pending, Decimal::ZERO);
}

#[test]
fn dealer_payments_round_trip() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "10", "0"))
        .unwrap();
    let p = rentals::create_rental_payment(
        &mut f.conn,
        NewRentalPayment {
            rental_id: r.id,
            date: day(3),
            amount: d("4000"),
            status: PaymentStatus::Completed,
            note: None,
        },
    )
    .unwrap();
    assert_eq!(p.dealer_id, f.dealer);
    assert_eq!(dealer_totals(&f), (d("6000"), d("4000")));

    rentals::delete_rental_payment(&mut f.conn, p.id).unwrap();
    assert_eq!(dealer_totals(&f), (d("10000"), Decimal::ZERO));
}

#[test]
fn pending_rental_payment_applies_on_completion() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "10", "0"))
        .unwrap();
    let p = rentals::create_rental_payment(
        &mut f.conn,
        NewRentalPayment {
            rental_id: r.id,
            date: day(3),
            amount: d("2500"),
            status: PaymentStatus::Pending,
            note: None,
        },
    )
    .unwrap();
    assert_eq!(dealer_totals(&f), (d("10000"), Decimal::ZERO));
    rentals::complete_rental_payment(&mut f.conn, p.id).unwrap();
    assert_eq!(dealer_totals(&f), (d("7500"), d("2500")));
}

#[test]
fn update_rental_re_deltas_dealer_and_owner() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "10", "1000"))
        .unwrap();
    let updated = rentals::update_rental(
        &mut f.conn,
        r.id,
        RentalPatch {
            total_hours_used: Some(d("15")),
            hourly_rate_to_dealer: Some(d("1100")),
            ..RentalPatch::default()
        },
    )
    .unwrap();
    assert_eq!(updated.total_amount_charged, d("16500"));
    assert_eq!(updated.total_cost_to_owner, d("9000"));
    assert_eq!(updated.profit_margin, d("7500"));
    assert_eq!(dealer_totals(&f), (d("15500"), d("1000")));
    let o = store::get_owner(&f.conn, f.owner).unwrap();
    assert_eq!(o.rental_amount_pending, d("9000"));
    assert!(doctor::check(&f.conn, d("0.01")).unwrap().is_empty());
}

#[test]
fn complete_rental_sets_end_and_status() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "5", "0"))
        .unwrap();
    let done = rentals::complete_rental(&mut f.conn, r.id, day(9), Some(d("8"))).unwrap();
    assert_eq!(done.status, RentalStatus::Completed);
    assert_eq!(done.end_date, Some(day(9)));
    assert_eq!(done.total_amount_charged, d("8000"));

    let again = rentals::complete_rental(&mut f.conn, r.id, day(10), None).unwrap_err();
    assert_eq!(again.kind(), "ValidationError");
}

#[test]
fn complete_rental_rejects_end_before_start() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "5", "0"))
        .unwrap();
    let mut early = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
    early = early.pred_opt().unwrap();
    let err = rentals::complete_rental(&mut f.conn, r.id, early, None).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
    let stored = store::get_rental(&f.conn, r.id).unwrap();
    assert_eq!(stored.status, RentalStatus::Active);
}

#[test]
fn rental_with_payments_cannot_be_deleted() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "10", "0"))
        .unwrap();
    rentals::create_rental_payment(
        &mut f.conn,
        NewRentalPayment {
            rental_id: r.id,
            date: day(2),
            amount: d("100"),
            status: PaymentStatus::Completed,
            note: None,
        },
    )
    .unwrap();
    let err = rentals::delete_rental(&mut f.conn, r.id).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
    assert!(store::get_rental(&f.conn, r.id).is_ok());
}

#[test]
fn deleting_a_rental_reverses_it() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "10", "2000"))
        .unwrap();
    rentals::delete_rental(&mut f.conn, r.id).unwrap();
    assert_eq!(dealer_totals(&f), (Decimal::ZERO, Decimal::ZERO));
    let o = store::get_owner(&f.conn, f.owner).unwrap();
    assert_eq!(o.rental_amount_pending, Decimal::ZERO);
}

#[test]
fn unknown_dealer_is_not_found() {
    let mut f = setup();
    let err = rentals::create_rental(&mut f.conn, new_rental(77, f.machine, "1", "0")).unwrap_err();
    assert_eq!(err.kind(), "NotFoundError");
    assert!(store::list_rentals(&f.conn, None, None).unwrap().is_empty());
}

#[test]
fn stale_profit_cache_is_reported() {
    let mut f = setup();
    let r = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "10", "0"))
        .unwrap();
    f.conn
        .execute(
            "UPDATE machine_rentals SET profit_margin='123' WHERE id=?1",
            [r.id],
        )
        .unwrap();
    let warnings = doctor::check(&f.conn, d("0.01")).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "profit_margin");
    assert_eq!(warnings[0].recomputed, d("4000"));
}

#[test]
fn oversized_rental_rate_is_rejected() {
    let mut f = setup();
    let mut input = new_rental(f.dealer, f.machine, "10", "0");
    input.hourly_rate_to_dealer = Some(d("79228162514264337593543950"));
    let err = rentals::create_rental(&mut f.conn, input).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
    assert!(store::list_rentals(&f.conn, None, None).unwrap().is_empty());
    assert_eq!(dealer_totals(&f), (Decimal::ZERO, Decimal::ZERO));

    let err = rentals::create_rental(&mut f.conn, new_rental(f.dealer, f.machine, "100001", "0"))
        .unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}
