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
use crate::ledger::{self, RentalDeltas, ensure_amount, ensure_hours};
use crate::models::{MachineRental, PaymentStatus, RentalPayment, RentalStatus};
use crate::store;
use crate::utils::{
    decimal_arg, fmt_amount, maybe_print_json, opt_decimal_arg, opt_text_arg, parse_date,
    parse_decimal, pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("update", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let patch = RentalPatch {
                total_hours_used: opt_decimal_arg(sub, "hours")?,
                hourly_rate_to_dealer: opt_decimal_arg(sub, "rate")?,
                hourly_cost_from_owner: opt_decimal_arg(sub, "owner_cost")?,
                advance_paid: opt_decimal_arg(sub, "advance")?,
                end_date: None,
            };
            let r = update_rental(conn, id, patch)?;
            println!(
                "Updated rental {}: charged {}, owner cost {}",
                r.id,
                fmt_amount(&r.total_amount_charged),
                fmt_amount(&r.total_cost_to_owner)
            );
        }
        Some(("complete", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let end = parse_date(sub.get_one::<String>("date").unwrap())?;
            let hours = opt_decimal_arg(sub, "hours")?;
            let r = complete_rental(conn, id, end, hours)?;
            println!(
                "Rental {} completed: {} hours, charged {}",
                r.id,
                r.total_hours_used,
                fmt_amount(&r.total_amount_charged)
            );
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let r = delete_rental(conn, id)?;
            println!("Removed rental {}", r.id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn handle_payments(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = NewRentalPayment {
                rental_id: *sub.get_one::<i64>("rental").unwrap(),
                date: parse_date(sub.get_one::<String>("date").unwrap())?,
                amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
                status: if sub.get_flag("pending") {
                    PaymentStatus::Pending
                } else {
                    PaymentStatus::Completed
                },
                note: opt_text_arg(sub, "note"),
            };
            let p = create_rental_payment(conn, input)?;
            println!(
                "Recorded rental payment {} of {} from dealer {}",
                p.id,
                fmt_amount(&p.amount),
                p.dealer_id
            );
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let p = delete_rental_payment(conn, id)?;
            println!("Removed rental payment {} ({})", p.id, fmt_amount(&p.amount));
        }
        Some(("complete", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let p = complete_rental_payment(conn, id)?;
            println!("Rental payment {} completed", p.id);
        }
        Some(("list", sub)) => {
            let data = store::list_rental_payments(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.date.to_string(),
                            p.rental_id.to_string(),
                            p.dealer_id.to_string(),
                            fmt_amount(&p.amount),
                            p.status.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Date", "Rental", "Dealer", "Amount", "Status"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewRental {
    pub dealer_id: i64,
    pub machine_id: i64,
    pub start_date: NaiveDate,
    pub total_hours_used: Decimal,
    /// Defaults to the machine's farmer-facing rate.
    pub hourly_rate_to_dealer: Option<Decimal>,
    /// Defaults to the machine's owner rate.
    pub hourly_cost_from_owner: Option<Decimal>,
    pub advance_paid: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct RentalPatch {
    pub total_hours_used: Option<Decimal>,
    pub hourly_rate_to_dealer: Option<Decimal>,
    pub hourly_cost_from_owner: Option<Decimal>,
    pub advance_paid: Option<Decimal>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewRentalPayment {
    pub rental_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub note: Option<String>,
}

fn validate_rental(r: &MachineRental) -> LedgerResult<()> {
    ensure_hours("total_hours_used", r.total_hours_used)?;
    ensure_amount("hourly_rate_to_dealer", r.hourly_rate_to_dealer)?;
    ensure_amount("hourly_cost_from_owner", r.hourly_cost_from_owner)?;
    ensure_amount("advance_paid", r.advance_paid)?;
    Ok(())
}

/// Recomputes charge, owner cost and the profit cache from hours and rates.
fn price_rental(r: &mut MachineRental) {
    r.total_amount_charged = ledger::rental_charge(r.total_hours_used, r.hourly_rate_to_dealer);
    r.total_cost_to_owner = ledger::rental_owner_cost(r.total_hours_used, r.hourly_cost_from_owner);
    r.profit_margin = ledger::rental_profit(r);
}

fn apply_rental_deltas(
    conn: &Connection,
    rental: &MachineRental,
    owner_id: i64,
    deltas: RentalDeltas,
) -> LedgerResult<()> {
    store::apply_owner_rental_delta(conn, owner_id, deltas.owner_rental)?;
    store::apply_dealer_delta(conn, rental.dealer_id, deltas.dealer)?;
    Ok(())
}

pub fn create_rental(conn: &mut Connection, input: NewRental) -> LedgerResult<MachineRental> {
    let tx = write_tx(conn)?;
    let machine = store::get_machine(&tx, input.machine_id)?;
    store::get_dealer(&tx, input.dealer_id)?;

    let mut rental = MachineRental {
        id: 0,
        dealer_id: input.dealer_id,
        machine_id: input.machine_id,
        start_date: input.start_date,
        end_date: None,
        total_hours_used: input.total_hours_used,
        hourly_rate_to_dealer: input.hourly_rate_to_dealer.unwrap_or(machine.rate_per_hour),
        hourly_cost_from_owner: input
            .hourly_cost_from_owner
            .unwrap_or(machine.owner_rate_per_hour),
        total_amount_charged: Decimal::ZERO,
        total_cost_to_owner: Decimal::ZERO,
        profit_margin: Decimal::ZERO,
        advance_paid: input.advance_paid,
        status: RentalStatus::Active,
    };
    validate_rental(&rental)?;
    price_rental(&mut rental);

    rental.id = store::insert_rental(&tx, &rental)?;
    apply_rental_deltas(&tx, &rental, machine.owner_id, ledger::rental_deltas(&rental))?;
    tx.commit()?;
    tracing::info!(
        rental_id = rental.id,
        dealer_id = rental.dealer_id,
        charged = %rental.total_amount_charged,
        owner_cost = %rental.total_cost_to_owner,
        "rental created"
    );
    Ok(rental)
}

pub fn update_rental(
    conn: &mut Connection,
    id: i64,
    patch: RentalPatch,
) -> LedgerResult<MachineRental> {
    let tx = write_tx(conn)?;
    let rental = update_rental_in(&tx, id, patch, None)?;
    tx.commit()?;
    Ok(rental)
}

/// Closes a rental, optionally recording the final hour count.
pub fn complete_rental(
    conn: &mut Connection,
    id: i64,
    end_date: NaiveDate,
    final_hours: Option<Decimal>,
) -> LedgerResult<MachineRental> {
    let tx = write_tx(conn)?;
    let current = store::get_rental(&tx, id)?;
    if current.status == RentalStatus::Completed {
        return Err(LedgerError::validation(format!(
            "rental {} is already completed",
            id
        )));
    }
    if end_date < current.start_date {
        return Err(LedgerError::validation(format!(
            "end date {} is before start date {}",
            end_date, current.start_date
        )));
    }
    let patch = RentalPatch {
        total_hours_used: final_hours,
        end_date: Some(end_date),
        ..RentalPatch::default()
    };
    let rental = update_rental_in(&tx, id, patch, Some(RentalStatus::Completed))?;
    tx.commit()?;
    Ok(rental)
}

fn update_rental_in(
    conn: &Connection,
    id: i64,
    patch: RentalPatch,
    status: Option<RentalStatus>,
) -> LedgerResult<MachineRental> {
    let old = store::get_rental(conn, id)?;
    let machine = store::get_machine(conn, old.machine_id)?;

    let mut rental = old.clone();
    if let Some(v) = patch.total_hours_used {
        rental.total_hours_used = v;
    }
    if let Some(v) = patch.hourly_rate_to_dealer {
        rental.hourly_rate_to_dealer = v;
    }
    if let Some(v) = patch.hourly_cost_from_owner {
        rental.hourly_cost_from_owner = v;
    }
    if let Some(v) = patch.advance_paid {
        rental.advance_paid = v;
    }
    if patch.end_date.is_some() {
        rental.end_date = patch.end_date;
    }
    if let Some(s) = status {
        rental.status = s;
    }
    validate_rental(&rental)?;
    price_rental(&mut rental);

    store::update_rental(conn, &rental)?;
    apply_rental_deltas(conn, &old, machine.owner_id, -ledger::rental_deltas(&old))?;
    apply_rental_deltas(conn, &rental, machine.owner_id, ledger::rental_deltas(&rental))?;
    tracing::info!(
        rental_id = id,
        status = %rental.status,
        charged = %rental.total_amount_charged,
        "rental updated"
    );
    Ok(rental)
}

/// Deletes a rental with no recorded payments, reversing its deltas.
pub fn delete_rental(conn: &mut Connection, id: i64) -> LedgerResult<MachineRental> {
    let tx = write_tx(conn)?;
    let rental = store::get_rental(&tx, id)?;
    if store::count_rental_payments(&tx, id)? > 0 {
        return Err(LedgerError::validation(format!(
            "rental {} still has payments; remove them first",
            id
        )));
    }
    let machine = store::get_machine(&tx, rental.machine_id)?;
    apply_rental_deltas(&tx, &rental, machine.owner_id, -ledger::rental_deltas(&rental))?;
    store::delete_rental(&tx, id)?;
    tx.commit()?;
    tracing::info!(rental_id = id, "rental deleted");
    Ok(rental)
}

/// Records money from the rental's dealer: paid goes up and pending down by
/// `amount`. Stored pending is left unclamped so a later delete restores it
/// exactly; reports floor it at zero.
pub fn create_rental_payment(
    conn: &mut Connection,
    input: NewRentalPayment,
) -> LedgerResult<RentalPayment> {
    ensure_amount("amount", input.amount)?;
    let tx = write_tx(conn)?;
    let rental = store::get_rental(&tx, input.rental_id)?;
    let mut payment = RentalPayment {
        id: 0,
        rental_id: rental.id,
        dealer_id: rental.dealer_id,
        date: input.date,
        amount: input.amount,
        status: input.status,
        note: input.note,
    };
    payment.id = store::insert_rental_payment(&tx, &payment)?;
    store::apply_dealer_delta(&tx, payment.dealer_id, ledger::rental_payment_delta(&payment))?;
    tx.commit()?;
    tracing::info!(
        rental_payment_id = payment.id,
        dealer_id = payment.dealer_id,
        amount = %payment.amount,
        "rental payment created"
    );
    Ok(payment)
}

pub fn delete_rental_payment(conn: &mut Connection, id: i64) -> LedgerResult<RentalPayment> {
    let tx = write_tx(conn)?;
    let payment = store::get_rental_payment(&tx, id)?;
    store::apply_dealer_delta(&tx, payment.dealer_id, -ledger::rental_payment_delta(&payment))?;
    store::delete_rental_payment(&tx, id)?;
    tx.commit()?;
    tracing::info!(rental_payment_id = id, amount = %payment.amount, "rental payment deleted");
    Ok(payment)
}

pub fn complete_rental_payment(conn: &mut Connection, id: i64) -> LedgerResult<RentalPayment> {
    let tx = write_tx(conn)?;
    let mut payment = store::get_rental_payment(&tx, id)?;
    if payment.status == PaymentStatus::Completed {
        return Err(LedgerError::validation(format!(
            "rental payment {} is already completed",
            id
        )));
    }
    payment.status = PaymentStatus::Completed;
    store::set_rental_payment_status(&tx, id, payment.status)?;
    store::apply_dealer_delta(&tx, payment.dealer_id, ledger::rental_payment_delta(&payment))?;
    tx.commit()?;
    Ok(payment)
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = NewRental {
        dealer_id: *sub.get_one::<i64>("dealer").unwrap(),
        machine_id: *sub.get_one::<i64>("machine").unwrap(),
        start_date: parse_date(sub.get_one::<String>("date").unwrap())?,
        total_hours_used: decimal_arg(sub, "hours")?,
        hourly_rate_to_dealer: opt_decimal_arg(sub, "rate")?,
        hourly_cost_from_owner: opt_decimal_arg(sub, "owner_cost")?,
        advance_paid: decimal_arg(sub, "advance")?,
    };
    let r = create_rental(conn, input)?;
    println!(
        "Recorded rental {} for dealer {}: charged {}, owner cost {}",
        r.id,
        r.dealer_id,
        fmt_amount(&r.total_amount_charged),
        fmt_amount(&r.total_cost_to_owner)
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let village = opt_text_arg(sub, "village");
    let machine = sub.get_one::<i64>("machine").copied();
    let data = store::list_rentals(conn, machine, village.as_deref())?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.start_date.to_string(),
                    r.dealer_id.to_string(),
                    r.machine_id.to_string(),
                    r.total_hours_used.to_string(),
                    fmt_amount(&r.total_amount_charged),
                    fmt_amount(&r.total_cost_to_owner),
                    fmt_amount(&ledger::rental_profit(r)),
                    fmt_amount(&r.advance_paid),
                    r.status.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Start", "Dealer", "Machine", "Hours", "Charged", "Owner cost",
                    "Profit", "Advance", "Status",
                ],
                rows,
            )
        );
    }
    Ok(())
}
