// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;
use serde::Serialize;

use crate::commands::jobs::job_rows;
use crate::commands::payments::payment_rows;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("jobs", sub)) => {
            let (fmt, out) = target(sub)?;
            let rows = job_rows(conn, None, None)?;
            write_rows(&fmt, out, &rows)?;
            println!("Exported {} jobs to {}", rows.len(), out);
            Ok(())
        }
        Some(("payments", sub)) => {
            let (fmt, out) = target(sub)?;
            let rows = payment_rows(conn)?;
            write_rows(&fmt, out, &rows)?;
            println!("Exported {} payments to {}", rows.len(), out);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Validated before anything is read or written.
fn target(sub: &clap::ArgMatches) -> Result<(String, &str)> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().as_str();
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }
    Ok((fmt, out))
}

fn write_rows<T: Serialize>(fmt: &str, out: &str, rows: &[T]) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        _ => std::fs::write(out, serde_json::to_string_pretty(rows)?)?,
    }
    Ok(())
}
