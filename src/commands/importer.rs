// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::jobs::{NewJob, create_job_in};
use crate::db::write_tx;
use crate::utils::{parse_date, parse_decimal};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("jobs", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let n = import_jobs(conn, path)?;
            println!("Imported {} jobs from {}", n, path);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Columns by header name; blank optional cells fall back like the CLI.
#[derive(Debug, Deserialize)]
struct JobRecord {
    date: String,
    farmer_id: i64,
    machine_id: i64,
    hours: String,
    #[serde(default)]
    rate_per_hour: Option<String>,
    #[serde(default)]
    total_amount: Option<String>,
    #[serde(default)]
    advance_from_farmer: Option<String>,
    #[serde(default)]
    discount_to_farmer: Option<String>,
    #[serde(default)]
    discount_from_owner: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

fn opt_cell(raw: &Option<String>) -> Result<Option<Decimal>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_decimal(v).map(Some),
    }
}

/// Books every row through the regular job path inside one transaction.
/// Any bad row aborts the whole import.
pub fn import_jobs(conn: &mut Connection, path: &str) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = write_tx(conn)?;
    let mut count = 0;
    for (idx, result) in rdr.deserialize::<JobRecord>().enumerate() {
        let line = idx + 2;
        let rec = result.with_context(|| format!("Malformed row at line {}", line))?;
        let input = NewJob {
            farmer_id: rec.farmer_id,
            machine_id: rec.machine_id,
            date: parse_date(&rec.date).with_context(|| format!("line {}", line))?,
            hours: parse_decimal(&rec.hours).with_context(|| format!("line {}", line))?,
            rate_per_hour: opt_cell(&rec.rate_per_hour)?,
            total_amount: opt_cell(&rec.total_amount)?,
            advance_from_farmer: opt_cell(&rec.advance_from_farmer)?.unwrap_or_default(),
            discount_to_farmer: opt_cell(&rec.discount_to_farmer)?.unwrap_or_default(),
            discount_from_owner: opt_cell(&rec.discount_from_owner)?.unwrap_or_default(),
            note: rec.note.filter(|n| !n.trim().is_empty()),
        };
        create_job_in(&tx, input).with_context(|| format!("Cannot import line {}", line))?;
        count += 1;
    }
    tx.commit()?;
    tracing::info!(count, path, "jobs imported");
    Ok(count)
}
