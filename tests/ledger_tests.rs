// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use harvestledger::error::LedgerError;
use harvestledger::ledger::{self, Delta};
use harvestledger::models::{HarvestingJob, MachineRental, RentalStatus};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn job(hours: &str, rate: &str, owner_rate: &str) -> HarvestingJob {
    HarvestingJob {
        id: 1,
        farmer_id: 1,
        machine_id: 1,
        date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        hours: d(hours),
        rate_per_hour: d(rate),
        total_amount: None,
        owner_rate_per_hour: d(owner_rate),
        advance_from_farmer: Decimal::ZERO,
        discount_to_farmer: Decimal::ZERO,
        discount_from_owner: Decimal::ZERO,
        net_amount_from_farmer: Decimal::ZERO,
        net_owner_amount: Decimal::ZERO,
        note: None,
    }
}

fn rental(charged: &str, cost: &str, cached_profit: &str) -> MachineRental {
    MachineRental {
        id: 1,
        dealer_id: 1,
        machine_id: 1,
        start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        end_date: None,
        total_hours_used: d("10"),
        hourly_rate_to_dealer: d("100"),
        hourly_cost_from_owner: d("60"),
        total_amount_charged: d(charged),
        total_cost_to_owner: d(cost),
        profit_margin: d(cached_profit),
        advance_paid: Decimal::ZERO,
        status: RentalStatus::Active,
    }
}

#[test]
fn gross_farmer_amount_prefers_positive_override() {
    let mut j = job("10", "1500", "1000");
    assert_eq!(ledger::gross_farmer_amount(&j), d("15000"));

    j.total_amount = Some(d("14000"));
    assert_eq!(ledger::gross_farmer_amount(&j), d("14000"));

    j.total_amount = Some(Decimal::ZERO);
    assert_eq!(ledger::gross_farmer_amount(&j), d("15000"));
}

#[test]
fn net_amounts_clamp_discounts_to_gross() {
    let mut j = job("10", "1500", "1000");
    j.discount_to_farmer = d("500");
    j.discount_from_owner = d("20000");
    assert_eq!(ledger::net_farmer_amount(&j), d("14500"));
    // an oversized discount zeroes the amount instead of going negative
    assert_eq!(ledger::net_owner_amount(&j, &j), Decimal::ZERO);

    j.discount_to_farmer = d("-10");
    assert_eq!(ledger::net_farmer_amount(&j), d("15000"));
}

#[test]
fn owner_amount_follows_the_rate_it_is_given() {
    let j = job("8", "1500", "1000");
    assert_eq!(ledger::gross_owner_amount(&j, &j), d("8000"));
    assert_eq!(ledger::gross_owner_amount(&j, &d("1200")), d("9600"));
}

#[test]
fn fractional_hours_keep_full_precision() {
    let j = job("2.5", "1333.33", "999.99");
    assert_eq!(ledger::gross_farmer_amount(&j), d("3333.325"));
    assert_eq!(ledger::net_owner_amount(&j, &j), d("2499.975"));
}

#[test]
fn rental_profit_ignores_wrong_cached_margin() {
    let r = rental("1000", "600", "999999");
    assert_eq!(ledger::rental_profit(&r), d("400"));

    let r = rental("500", "700", "0");
    assert_eq!(ledger::rental_profit(&r), d("-200"));
}

#[test]
fn validate_job_rejects_discount_above_gross() {
    let mut j = job("10", "1500", "1000");
    j.discount_to_farmer = d("15000.01");
    let err = ledger::validate_job(&j, &j).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");

    j.discount_to_farmer = d("15000");
    j.discount_from_owner = d("10000.5");
    assert!(matches!(
        ledger::validate_job(&j, &j),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn validate_job_rejects_negative_hours() {
    let j = job("-1", "1500", "1000");
    let err = ledger::validate_job(&j, &j).unwrap_err();
    assert!(err.to_string().contains("hours"));
}

#[test]
fn price_job_freezes_rate_and_nets() {
    let mut j = job("10", "1500", "0");
    j.discount_to_farmer = d("1000");
    j.discount_from_owner = d("500");
    ledger::price_job(&mut j, &d("900"));
    assert_eq!(j.owner_rate_per_hour, d("900"));
    assert_eq!(j.net_amount_from_farmer, d("14000"));
    assert_eq!(j.net_owner_amount, d("8500"));
}

#[test]
fn job_deltas_negate_exactly() {
    let mut j = job("10", "1500", "1000");
    j.advance_from_farmer = d("2000");
    ledger::price_job(&mut j, &d("1000"));
    let deltas = ledger::job_deltas(&j);
    assert_eq!(deltas.machine_pending, d("10000"));
    assert_eq!(deltas.owner, Delta::owed(d("10000")));
    assert_eq!(deltas.farmer.pending, d("13000"));
    assert_eq!(deltas.farmer.paid, d("2000"));

    let back = -deltas;
    assert_eq!(deltas.owner + back.owner, Delta::ZERO);
    assert_eq!(deltas.farmer + back.farmer, Delta::ZERO);
}

#[test]
fn payment_net_rejects_bad_discount() {
    assert_eq!(
        ledger::net_payment_amount(d("1000"), d("100")).unwrap(),
        d("900")
    );
    assert!(ledger::net_payment_amount(d("1000"), d("1000.01")).is_err());
    assert!(ledger::net_payment_amount(d("1000"), d("-1")).is_err());
    assert!(ledger::net_payment_amount(d("-5"), Decimal::ZERO).is_err());
}

#[test]
fn outstanding_is_floored_at_zero() {
    assert_eq!(ledger::outstanding(d("100"), d("40")), d("60"));
    assert_eq!(ledger::outstanding(d("100"), d("140")), Decimal::ZERO);
}

#[test]
fn error_body_carries_kind_and_message() {
    let body = LedgerError::not_found("Machine", 7).body();
    assert_eq!(body.kind, "NotFoundError");
    assert_eq!(body.message, "Machine 7 not found");
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["kind"], "NotFoundError");
}

#[test]
fn amounts_are_bounded_above() {
    let limit = Decimal::from(ledger::MAX_AMOUNT);
    assert!(ledger::ensure_amount("amount", limit).is_ok());
    let err = ledger::ensure_amount("amount", limit + d("0.01")).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
    assert!(ledger::net_payment_amount(d("79228162514264337593543950"), Decimal::ZERO).is_err());
}

#[test]
fn oversized_hours_fail_validation_before_pricing() {
    let j = job("79228162514264337593543950", "1000000", "1000");
    let err = ledger::validate_job(&j, &d("1000")).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
    assert!(err.to_string().contains("hours"));

    let huge_rate = job("10", "1000000000000.01", "1000");
    assert!(ledger::validate_job(&huge_rate, &d("1000")).is_err());
    let limit = job("100000", "1000000000000", "1000000000000");
    assert!(ledger::validate_job(&limit, &d("1000000000000")).is_ok());
}
