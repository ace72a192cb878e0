// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use harvestledger::commands::{config, jobs, machines, owners, parties, payments, reports};
use harvestledger::{cli, db, store, utils};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn seeded() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let owner = owners::create_owner(&conn, "Gurpreet", None, d("1000")).unwrap();
    machines::create_machine(&conn, owner.id, "C1", None, d("1500"), None).unwrap();
    parties::create_farmer(&conn, "Ramesh", Some("Rampur"), None).unwrap();
    conn
}

fn sub<'a>(m: &'a clap::ArgMatches, name: &str) -> &'a clap::ArgMatches {
    match m.subcommand() {
        Some((found, sub)) if found == name => sub,
        _ => panic!("no {} subcommand", name),
    }
}

#[test]
fn config_defaults_and_normalizes() {
    let conn = seeded();
    assert_eq!(config::get(&conn, "currency").unwrap(), "INR");
    assert_eq!(config::get(&conn, "consistency_epsilon").unwrap(), "0.01");

    config::set(&conn, "currency", " usd ").unwrap();
    assert_eq!(utils::get_currency(&conn).unwrap(), "USD");

    config::set(&conn, "consistency_epsilon", "0.5").unwrap();
    assert_eq!(utils::get_epsilon(&conn).unwrap(), d("0.5"));

    assert!(config::set(&conn, "consistency_epsilon", "-1").is_err());
    assert!(config::set(&conn, "theme", "dark").is_err());
    assert!(config::get(&conn, "theme").is_err());
}

#[test]
fn job_add_through_cli_books_balances() {
    let mut conn = seeded();
    let matches = cli::build_cli().get_matches_from([
        "harvestledger",
        "job",
        "add",
        "--farmer",
        "1",
        "--machine",
        "1",
        "--date",
        "2025-10-01",
        "--hours",
        "8",
        "--advance",
        "1000",
        "--owner-discount",
        "500",
    ]);
    jobs::handle(&mut conn, sub(&matches, "job")).unwrap();

    let job = store::get_job(&conn, 1).unwrap();
    assert_eq!(job.net_amount_from_farmer, d("12000"));
    assert_eq!(job.net_owner_amount, d("7500"));
    assert_eq!(store::get_owner(&conn, 1).unwrap().total_amount_pending, d("7500"));
    assert_eq!(store::get_farmer(&conn, 1).unwrap().total_amount_pending, d("11000"));
}

#[test]
fn job_add_rejects_bad_decimal_before_writing() {
    let mut conn = seeded();
    let matches = cli::build_cli().get_matches_from([
        "harvestledger",
        "job",
        "add",
        "--farmer",
        "1",
        "--machine",
        "1",
        "--date",
        "2025-10-01",
        "--hours",
        "eight",
    ]);
    assert!(jobs::handle(&mut conn, sub(&matches, "job")).is_err());
    assert!(store::list_jobs(&conn, None, None).unwrap().is_empty());
}

#[test]
fn pay_add_to_owner_with_discount_and_pending_flag() {
    let mut conn = seeded();
    let job_m = cli::build_cli().get_matches_from([
        "harvestledger", "job", "add", "--farmer", "1", "--machine", "1", "--date",
        "2025-10-01", "--hours", "10",
    ]);
    jobs::handle(&mut conn, sub(&job_m, "job")).unwrap();

    let pay_m = cli::build_cli().get_matches_from([
        "harvestledger", "pay", "add", "--to", "owner", "--owner", "1", "--date", "2025-10-03",
        "--amount", "4000", "--discount", "250", "--pending",
    ]);
    payments::handle(&mut conn, sub(&pay_m, "pay")).unwrap();

    let p = store::get_payment(&conn, 1).unwrap();
    assert_eq!(p.amount, d("3750"));
    assert_eq!(store::get_owner(&conn, 1).unwrap().total_amount_pending, d("10000"));

    let done_m =
        cli::build_cli().get_matches_from(["harvestledger", "pay", "complete", "--id", "1"]);
    payments::handle(&mut conn, sub(&done_m, "pay")).unwrap();
    assert_eq!(store::get_owner(&conn, 1).unwrap().total_amount_pending, d("6250"));
}

#[test]
fn owner_balances_list_rental_bucket_separately() {
    let mut conn = seeded();
    let pay_m = cli::build_cli().get_matches_from([
        "harvestledger", "pay", "add", "--to", "owner", "--source", "rental", "--owner", "1",
        "--date", "2025-10-03", "--amount", "900",
    ]);
    payments::handle(&mut conn, sub(&pay_m, "pay")).unwrap();

    let rows = reports::party_balances(&conn, "owners").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "Gurpreet");
    assert_eq!(rows[0].paid, Decimal::ZERO);
    assert_eq!(rows[1].name, "Gurpreet (rental)");
    assert_eq!(rows[1].paid, d("900"));
    assert_eq!(rows[1].pending, Decimal::ZERO);

    assert!(reports::party_balances(&conn, "tractors").is_err());
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let res = cli::build_cli().try_get_matches_from(["harvestledger", "job", "archive"]);
    assert!(res.is_err());
}
