// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::write_tx;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::ensure_amount;
use crate::models::DailyAdvance;
use crate::store;
use crate::utils::{
    fmt_amount, maybe_print_json, opt_text_arg, parse_date, parse_decimal, pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let owner_id = *sub.get_one::<i64>("owner").unwrap();
            let machine_id = sub.get_one::<i64>("machine").copied();
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let note = opt_text_arg(sub, "note");
            let a = create_advance(conn, owner_id, machine_id, date, amount, note)?;
            println!(
                "Recorded advance {} of {} to owner {}",
                a.id,
                fmt_amount(&a.amount),
                a.owner_id
            );
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let a = delete_advance(conn, id)?;
            println!("Removed advance {} ({})", a.id, fmt_amount(&a.amount));
        }
        Some(("list", sub)) => {
            let data = store::list_advances(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.date.to_string(),
                            a.owner_id.to_string(),
                            a.machine_id.map(|m| m.to_string()).unwrap_or_default(),
                            fmt_amount(&a.amount),
                            a.note.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Date", "Owner", "Machine", "Amount", "Note"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

/// Advances are tracked on their own and do not settle harvesting dues.
pub fn create_advance(
    conn: &mut Connection,
    owner_id: i64,
    machine_id: Option<i64>,
    date: NaiveDate,
    amount: Decimal,
    note: Option<String>,
) -> LedgerResult<DailyAdvance> {
    ensure_amount("amount", amount)?;
    let tx = write_tx(conn)?;
    store::get_owner(&tx, owner_id)?;
    if let Some(machine_id) = machine_id {
        let machine = store::get_machine(&tx, machine_id)?;
        if machine.owner_id != owner_id {
            return Err(LedgerError::validation(format!(
                "machine {} belongs to owner {}, not {}",
                machine_id, machine.owner_id, owner_id
            )));
        }
    }
    let mut advance = DailyAdvance {
        id: 0,
        owner_id,
        machine_id,
        date,
        amount,
        note,
    };
    advance.id = store::insert_advance(&tx, &advance)?;
    store::apply_owner_advance(&tx, owner_id, amount)?;
    tx.commit()?;
    tracing::info!(advance_id = advance.id, owner_id, amount = %amount, "advance recorded");
    Ok(advance)
}

pub fn delete_advance(conn: &mut Connection, id: i64) -> LedgerResult<DailyAdvance> {
    let tx = write_tx(conn)?;
    let advance = store::get_advance(&tx, id)?;
    store::apply_owner_advance(&tx, advance.owner_id, -advance.amount)?;
    store::delete_advance(&tx, id)?;
    tx.commit()?;
    tracing::info!(advance_id = id, amount = %advance.amount, "advance deleted");
    Ok(advance)
}
