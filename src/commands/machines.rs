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
use crate::models::Machine;
use crate::store;
use crate::utils::{fmt_amount, maybe_print_json, opt_decimal_arg, opt_text_arg, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let owner_id = *sub.get_one::<i64>("owner").unwrap();
            let name = sub.get_one::<String>("name").unwrap();
            let machine_type = opt_text_arg(sub, "type");
            let rate = opt_decimal_arg(sub, "rate")?.unwrap_or(Decimal::ZERO);
            let owner_rate = opt_decimal_arg(sub, "owner_rate")?;
            let machine =
                create_machine(conn, owner_id, name, machine_type.as_deref(), rate, owner_rate)?;
            println!(
                "Added machine '{}' (id {}) for owner {}: {}/h to farmers, {}/h to owner",
                machine.name,
                machine.id,
                machine.owner_id,
                fmt_amount(&machine.rate_per_hour),
                fmt_amount(&machine.owner_rate_per_hour)
            );
        }
        Some(("set-rate", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let rate = opt_decimal_arg(sub, "rate")?;
            let owner_rate = opt_decimal_arg(sub, "owner_rate")?;
            let machine = set_machine_rates(conn, id, rate, owner_rate)?;
            println!(
                "Machine {} now {}/h to farmers, {}/h to owner",
                machine.id,
                fmt_amount(&machine.rate_per_hour),
                fmt_amount(&machine.owner_rate_per_hour)
            );
        }
        Some(("list", sub)) => {
            let data = machine_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.name,
                            r.machine_type.unwrap_or_default(),
                            r.owner_id.to_string(),
                            r.rate_per_hour,
                            r.owner_rate_per_hour,
                            r.pending,
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Name", "Type", "Owner", "Rate/h", "Owner rate/h", "Pending"],
                        rows,
                    )
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct MachineRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub machine_type: Option<String>,
    pub rate_per_hour: String,
    pub owner_rate_per_hour: String,
    pub pending: String,
}

pub fn machine_rows(conn: &Connection) -> LedgerResult<Vec<MachineRow>> {
    Ok(store::list_machines(conn)?
        .into_iter()
        .map(|m| MachineRow {
            id: m.id,
            owner_id: m.owner_id,
            name: m.name,
            machine_type: m.machine_type,
            rate_per_hour: fmt_amount(&m.rate_per_hour),
            owner_rate_per_hour: fmt_amount(&m.owner_rate_per_hour),
            pending: fmt_amount(&outstanding(m.total_amount_pending, Decimal::ZERO)),
        })
        .collect())
}

/// Registers a machine. Without an explicit owner rate the owner's nominal
/// rate is copied onto the machine.
pub fn create_machine(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    machine_type: Option<&str>,
    rate_per_hour: Decimal,
    owner_rate_per_hour: Option<Decimal>,
) -> LedgerResult<Machine> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("machine name is required"));
    }
    let owner = store::get_owner(conn, owner_id)?;
    let owner_rate = owner_rate_per_hour.unwrap_or(owner.owner_rate_per_hour);
    ensure_amount("rate_per_hour", rate_per_hour)?;
    ensure_amount("owner_rate_per_hour", owner_rate)?;
    let id = store::insert_machine(conn, owner_id, name, machine_type, rate_per_hour, owner_rate)?;
    tracing::info!(machine_id = id, owner_id, "machine created");
    store::get_machine(conn, id)
}

/// Changes a machine's rates for future bookings. Existing jobs keep the
/// owner rate frozen on them.
pub fn set_machine_rates(
    conn: &Connection,
    id: i64,
    rate_per_hour: Option<Decimal>,
    owner_rate_per_hour: Option<Decimal>,
) -> LedgerResult<Machine> {
    let current = store::get_machine(conn, id)?;
    let rate = rate_per_hour.unwrap_or(current.rate_per_hour);
    let owner_rate = owner_rate_per_hour.unwrap_or(current.owner_rate_per_hour);
    ensure_amount("rate_per_hour", rate)?;
    ensure_amount("owner_rate_per_hour", owner_rate)?;
    store::update_machine_rates(conn, id, rate, owner_rate)?;
    tracing::info!(
        machine_id = id,
        rate = %rate,
        owner_rate = %owner_rate,
        "machine rates changed"
    );
    store::get_machine(conn, id)
}
