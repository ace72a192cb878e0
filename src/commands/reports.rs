// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::balances::{self, ReportFilter, Snapshot};
use crate::commands::dashboard::{PartyBalance, party_list};
use crate::utils::{fmt_amount, maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let (name, sub) = match m.subcommand() {
        Some(found) => found,
        None => return Ok(()),
    };
    let data = party_balances(conn, name)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|b| {
                vec![
                    b.id.to_string(),
                    b.name.clone(),
                    fmt_amount(&b.owed),
                    fmt_amount(&b.paid),
                    fmt_amount(&b.pending),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Name", "Owed", "Paid", "Pending"], rows)
        );
    }
    Ok(())
}

/// Recomputed balances for one kind of party: `owners` (harvesting and
/// rental buckets listed separately), `farmers` or `dealers`.
pub fn party_balances(conn: &Connection, kind: &str) -> Result<Vec<PartyBalance>> {
    let snapshot = Snapshot::load(conn, &ReportFilter::default())?;
    let totals = balances::accumulate(&snapshot);
    let out = match kind {
        "owners" => {
            let names: HashMap<i64, &str> = snapshot
                .owners
                .iter()
                .map(|o| (o.id, o.name.as_str()))
                .collect();
            let mut rows = party_list(&totals.owners, &names);
            for mut r in party_list(&totals.owner_rentals, &names) {
                if r.owed.is_zero() && r.paid.is_zero() {
                    continue;
                }
                r.name = format!("{} (rental)", r.name);
                rows.push(r);
            }
            rows
        }
        "farmers" => {
            let names: HashMap<i64, &str> = snapshot
                .farmers
                .iter()
                .map(|f| (f.id, f.name.as_str()))
                .collect();
            party_list(&totals.farmers, &names)
        }
        "dealers" => {
            let names: HashMap<i64, &str> = snapshot
                .dealers
                .iter()
                .map(|d| (d.id, d.name.as_str()))
                .collect();
            party_list(&totals.dealers, &names)
        }
        other => anyhow::bail!("Unknown balance report '{}'", other),
    };
    Ok(out)
}
