// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Farmers and dealers: the two paying counterparties.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::outstanding;
use crate::models::{Dealer, Farmer};
use crate::store;
use crate::utils::{fmt_amount, maybe_print_json, opt_text_arg, pretty_table};

pub fn handle_farmers(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let village = opt_text_arg(sub, "village");
            let phone = opt_text_arg(sub, "phone");
            let f = create_farmer(conn, name, village.as_deref(), phone.as_deref())?;
            println!("Added farmer '{}' (id {})", f.name, f.id);
        }
        Some(("list", sub)) => {
            let data = farmer_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data.into_iter().map(PartyRow::cells).collect();
                println!("{}", pretty_table(PARTY_HEADERS, rows));
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_dealers(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let village = opt_text_arg(sub, "village");
            let phone = opt_text_arg(sub, "phone");
            let d = create_dealer(conn, name, village.as_deref(), phone.as_deref())?;
            println!("Added dealer '{}' (id {})", d.name, d.id);
        }
        Some(("list", sub)) => {
            let data = dealer_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data.into_iter().map(PartyRow::cells).collect();
                println!("{}", pretty_table(PARTY_HEADERS, rows));
            }
        }
        _ => {}
    }
    Ok(())
}

const PARTY_HEADERS: &[&str] = &["ID", "Name", "Village", "Phone", "Pending", "Paid"];

/// Listing shape shared by farmers and dealers; pending is floored at zero.
#[derive(Serialize)]
pub struct PartyRow {
    pub id: i64,
    pub name: String,
    pub village: Option<String>,
    pub phone: Option<String>,
    pub pending: String,
    pub paid: String,
}

impl PartyRow {
    fn new(
        id: i64,
        name: String,
        village: Option<String>,
        phone: Option<String>,
        pending: Decimal,
        paid: Decimal,
    ) -> Self {
        Self {
            id,
            name,
            village,
            phone,
            pending: fmt_amount(&outstanding(pending, Decimal::ZERO)),
            paid: fmt_amount(&paid),
        }
    }

    fn cells(self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name,
            self.village.unwrap_or_default(),
            self.phone.unwrap_or_default(),
            self.pending,
            self.paid,
        ]
    }
}

pub fn farmer_rows(conn: &Connection) -> LedgerResult<Vec<PartyRow>> {
    Ok(store::list_farmers(conn)?
        .into_iter()
        .map(|f| {
            PartyRow::new(
                f.id,
                f.name,
                f.village,
                f.phone,
                f.total_amount_pending,
                f.total_amount_paid,
            )
        })
        .collect())
}

pub fn dealer_rows(conn: &Connection) -> LedgerResult<Vec<PartyRow>> {
    Ok(store::list_dealers(conn)?
        .into_iter()
        .map(|d| {
            PartyRow::new(
                d.id,
                d.name,
                d.village,
                d.phone,
                d.total_amount_pending,
                d.total_amount_paid,
            )
        })
        .collect())
}

fn required_name<'a>(kind: &str, name: &'a str) -> LedgerResult<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation(format!("{} name is required", kind)));
    }
    Ok(name)
}

pub fn create_farmer(
    conn: &Connection,
    name: &str,
    village: Option<&str>,
    phone: Option<&str>,
) -> LedgerResult<Farmer> {
    let name = required_name("farmer", name)?;
    let id = store::insert_farmer(conn, name, village, phone)?;
    tracing::info!(farmer_id = id, "farmer created");
    store::get_farmer(conn, id)
}

pub fn create_dealer(
    conn: &Connection,
    name: &str,
    village: Option<&str>,
    phone: Option<&str>,
) -> LedgerResult<Dealer> {
    let name = required_name("dealer", name)?;
    let id = store::insert_dealer(conn, name, village, phone)?;
    tracing::info!(dealer_id = id, "dealer created");
    store::get_dealer(conn, id)
}
