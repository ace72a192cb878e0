// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::balances::{self, ConsistencyWarning, ReportFilter, Snapshot};
use crate::error::LedgerResult;
use crate::utils::{fmt_amount, get_epsilon, pretty_table};
use anyhow::Result;
use rust_decimal::Decimal;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows: Vec<Vec<String>> = check(conn, get_epsilon(conn)?)?
        .into_iter()
        .map(|w| {
            vec![
                w.subject,
                w.field.to_string(),
                fmt_amount(&w.stored),
                fmt_amount(&w.recomputed),
            ]
        })
        .collect();

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!(
            "{}",
            pretty_table(&["Subject", "Field", "Stored", "Recomputed"], rows)
        );
    }
    Ok(())
}

/// Every stored total or cached amount that drifted from its recomputation
/// by more than `epsilon`. Nothing is corrected.
pub fn check(conn: &Connection, epsilon: Decimal) -> LedgerResult<Vec<ConsistencyWarning>> {
    let snapshot = Snapshot::load(conn, &ReportFilter::default())?;
    let totals = balances::accumulate(&snapshot);
    Ok(balances::reconcile(&snapshot, &totals, epsilon))
}
