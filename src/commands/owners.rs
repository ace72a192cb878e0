// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{ensure_amount, outstanding};
use crate::models::Owner;
use crate::store;
use crate::utils::{decimal_arg, fmt_amount, maybe_print_json, opt_text_arg, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let phone = opt_text_arg(sub, "phone");
            let rate = decimal_arg(sub, "rate")?;
            let owner = create_owner(conn, name, phone.as_deref(), rate)?;
            println!(
                "Added owner '{}' (id {}, rate {}/h)",
                owner.name,
                owner.id,
                fmt_amount(&owner.owner_rate_per_hour)
            );
        }
        Some(("list", sub)) => {
            let data = owner_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.name,
                            r.phone.unwrap_or_default(),
                            r.owner_rate_per_hour,
                            r.pending,
                            r.paid,
                            r.rental_pending,
                            r.advances_given,
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &[
                            "ID",
                            "Name",
                            "Phone",
                            "Rate/h",
                            "Pending",
                            "Paid",
                            "Rental pending",
                            "Advances",
                        ],
                        rows,
                    )
                );
            }
        }
        _ => {}
    }
    Ok(())
}

/// Listing shape for owners. Pending figures are floored at zero; the
/// stored running totals may be negative after an overpayment.
#[derive(Serialize)]
pub struct OwnerRow {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub owner_rate_per_hour: String,
    pub pending: String,
    pub paid: String,
    pub rental_pending: String,
    pub rental_paid: String,
    pub advances_given: String,
}

pub fn owner_rows(conn: &Connection) -> LedgerResult<Vec<OwnerRow>> {
    Ok(store::list_owners(conn)?
        .into_iter()
        .map(|o| OwnerRow {
            id: o.id,
            name: o.name,
            phone: o.phone,
            owner_rate_per_hour: fmt_amount(&o.owner_rate_per_hour),
            pending: fmt_amount(&outstanding(o.total_amount_pending, Decimal::ZERO)),
            paid: fmt_amount(&o.total_amount_paid),
            rental_pending: fmt_amount(&outstanding(o.rental_amount_pending, Decimal::ZERO)),
            rental_paid: fmt_amount(&o.rental_amount_paid),
            advances_given: fmt_amount(&o.total_advances_given),
        })
        .collect())
}

pub fn create_owner(
    conn: &Connection,
    name: &str,
    phone: Option<&str>,
    owner_rate_per_hour: Decimal,
) -> LedgerResult<Owner> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("owner name is required"));
    }
    ensure_amount("owner_rate_per_hour", owner_rate_per_hour)?;
    let id = store::insert_owner(conn, name, phone, owner_rate_per_hour)?;
    tracing::info!(owner_id = id, "owner created");
    store::get_owner(conn, id)
}
