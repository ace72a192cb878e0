// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use harvestledger::commands::jobs::{self, NewJob};
use harvestledger::commands::payments::{self, NewPayment};
use harvestledger::models::{BusinessSource, PaymentStatus, PaymentType};
use harvestledger::commands::{exporter, machines, owners, parties};
use harvestledger::{cli, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::json;
use tempfile::tempdir;

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let owner = owners::create_owner(&conn, "Gurpreet", None, "1000".parse().unwrap()).unwrap();
    let machine =
        machines::create_machine(&conn, owner.id, "C1", None, "1500".parse().unwrap(), None)
            .unwrap();
    let farmer = parties::create_farmer(&conn, "Ramesh", Some("Rampur"), None).unwrap();
    jobs::create_job(
        &mut conn,
        NewJob {
            farmer_id: farmer.id,
            machine_id: machine.id,
            date: NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
            hours: "10".parse().unwrap(),
            rate_per_hour: None,
            total_amount: None,
            advance_from_farmer: "2000".parse().unwrap(),
            discount_to_farmer: "500".parse().unwrap(),
            discount_from_owner: Decimal::ZERO,
            note: None,
        },
    )
    .unwrap();
    conn
}

#[test]
fn export_jobs_writes_pretty_json() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("jobs.json");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "harvestledger",
        "export",
        "jobs",
        "--format",
        "json",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        parsed,
        json!([
            {
                "id": 1,
                "date": "2025-10-02",
                "farmer_id": 1,
                "machine_id": 1,
                "hours": "10",
                "gross_farmer": "15000.00",
                "net_farmer": "14500.00",
                "net_owner": "10000.00",
                "advance": "2000.00"
            }
        ])
    );
}

#[test]
fn export_payments_defaults_to_csv() {
    let mut conn = base_conn();
    payments::create_payment(
        &mut conn,
        NewPayment {
            payment_type: PaymentType::FromFarmer,
            business_source: BusinessSource::Harvesting,
            owner_id: None,
            farmer_id: None,
            job_id: Some(1),
            date: NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
            gross_amount: "3000".parse().unwrap(),
            discount_amount: Decimal::ZERO,
            status: PaymentStatus::Completed,
            note: None,
        },
    )
    .unwrap();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("payments.csv");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "harvestledger",
        "export",
        "payments",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }
    let contents = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("id,date,type,business_source,party,job_id,gross_amount,discount_amount,amount,status")
    );
    assert_eq!(
        lines.next(),
        Some("1,2025-10-09,From Farmer,harvesting,farmer 1,1,3000.00,0.00,3000.00,Completed")
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn export_rejects_unknown_format() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("jobs.xml");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "harvestledger",
        "export",
        "jobs",
        "--format",
        "xml",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        assert!(exporter::handle(&conn, export_m).is_err());
    } else {
        panic!("no export subcommand");
    }
    assert!(!out_path.exists());
}
