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
use crate::error::LedgerResult;
use crate::ledger::{self, ensure_amount};
use crate::models::DailyExpense;
use crate::store;
use crate::utils::{
    fmt_amount, maybe_print_json, opt_text_arg, parse_date, parse_decimal, pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let machine_id = *sub.get_one::<i64>("machine").unwrap();
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let description = opt_text_arg(sub, "description");
            let e = create_expense(conn, machine_id, date, amount, description)?;
            println!(
                "Recorded expense {} of {} on machine {}",
                e.id,
                fmt_amount(&e.amount),
                e.machine_id
            );
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let e = delete_expense(conn, id)?;
            println!("Removed expense {} ({})", e.id, fmt_amount(&e.amount));
        }
        Some(("list", sub)) => {
            let data = store::list_expenses(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|e| {
                        vec![
                            e.id.to_string(),
                            e.date.to_string(),
                            e.machine_id.to_string(),
                            fmt_amount(&e.amount),
                            e.description.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Date", "Machine", "Amount", "Description"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

/// Money spent on a machine counts as already delivered to its owner.
pub fn create_expense(
    conn: &mut Connection,
    machine_id: i64,
    date: NaiveDate,
    amount: Decimal,
    description: Option<String>,
) -> LedgerResult<DailyExpense> {
    ensure_amount("amount", amount)?;
    let tx = write_tx(conn)?;
    let machine = store::get_machine(&tx, machine_id)?;
    let mut expense = DailyExpense {
        id: 0,
        machine_id,
        date,
        amount,
        description,
    };
    expense.id = store::insert_expense(&tx, &expense)?;
    apply_expense(&tx, &expense, machine.owner_id, false)?;
    tx.commit()?;
    tracing::info!(
        expense_id = expense.id,
        machine_id,
        amount = %expense.amount,
        "expense recorded"
    );
    Ok(expense)
}

pub fn delete_expense(conn: &mut Connection, id: i64) -> LedgerResult<DailyExpense> {
    let tx = write_tx(conn)?;
    let expense = store::get_expense(&tx, id)?;
    let machine = store::get_machine(&tx, expense.machine_id)?;
    apply_expense(&tx, &expense, machine.owner_id, true)?;
    store::delete_expense(&tx, id)?;
    tx.commit()?;
    tracing::info!(expense_id = id, amount = %expense.amount, "expense deleted");
    Ok(expense)
}

fn apply_expense(
    conn: &Connection,
    expense: &DailyExpense,
    owner_id: i64,
    reverse: bool,
) -> LedgerResult<()> {
    let mut delta = ledger::expense_delta(expense);
    if reverse {
        delta = -delta;
    }
    store::apply_machine_pending(conn, expense.machine_id, delta.pending)?;
    store::apply_owner_delta(conn, owner_id, delta)
}
