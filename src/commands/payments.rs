// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::write_tx;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{self, Delta};
use crate::models::{BusinessSource, Payment, PaymentStatus, PaymentType};
use crate::store;
use crate::utils::{
    decimal_arg, fmt_amount, maybe_print_json, opt_text_arg, parse_date, parse_decimal,
    pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let p = delete_payment(conn, id)?;
            println!("Removed payment {} ({})", p.id, fmt_amount(&p.amount));
        }
        Some(("complete", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let p = complete_payment(conn, id)?;
            println!("Payment {} completed ({})", p.id, fmt_amount(&p.amount));
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_type: PaymentType,
    pub business_source: BusinessSource,
    pub owner_id: Option<i64>,
    pub farmer_id: Option<i64>,
    pub job_id: Option<i64>,
    pub date: NaiveDate,
    pub gross_amount: Decimal,
    pub discount_amount: Decimal,
    pub status: PaymentStatus,
    pub note: Option<String>,
}

/// Records a payment and settles the paying or paid party by its net amount.
///
/// A payment names an owner xor a farmer. When it also names a job, the
/// party is taken from the job if omitted and must match it otherwise.
/// Owner payments land in the harvesting or rental bucket by
/// `business_source`; pending payments are stored without moving totals.
pub fn create_payment(conn: &mut Connection, input: NewPayment) -> LedgerResult<Payment> {
    let amount = ledger::net_payment_amount(input.gross_amount, input.discount_amount)?;

    let tx = write_tx(conn)?;
    let job = input.job_id.map(|id| store::get_job(&tx, id)).transpose()?;

    let (owner_id, farmer_id) = match input.payment_type {
        PaymentType::ToMachineOwner => {
            if input.farmer_id.is_some() {
                return Err(LedgerError::validation(
                    "a payment to a machine owner cannot reference a farmer",
                ));
            }
            let job_owner = match &job {
                Some(j) => Some(store::get_machine(&tx, j.machine_id)?.owner_id),
                None => None,
            };
            let owner_id = match (input.owner_id, job_owner) {
                (Some(given), Some(from_job)) if given != from_job => {
                    return Err(LedgerError::validation(format!(
                        "job {} belongs to owner {}, not {}",
                        input.job_id.unwrap_or_default(),
                        from_job,
                        given
                    )));
                }
                (Some(given), _) => given,
                (None, Some(from_job)) => from_job,
                (None, None) => {
                    return Err(LedgerError::validation(
                        "a payment to a machine owner needs an owner",
                    ));
                }
            };
            store::get_owner(&tx, owner_id)?;
            (Some(owner_id), None)
        }
        PaymentType::FromFarmer => {
            if input.owner_id.is_some() {
                return Err(LedgerError::validation(
                    "a payment from a farmer cannot reference an owner",
                ));
            }
            if input.business_source == BusinessSource::Rental {
                return Err(LedgerError::validation(
                    "farmer payments are always harvesting payments",
                ));
            }
            let farmer_id = match (input.farmer_id, job.as_ref().map(|j| j.farmer_id)) {
                (Some(given), Some(from_job)) if given != from_job => {
                    return Err(LedgerError::validation(format!(
                        "job {} belongs to farmer {}, not {}",
                        input.job_id.unwrap_or_default(),
                        from_job,
                        given
                    )));
                }
                (Some(given), _) => given,
                (None, Some(from_job)) => from_job,
                (None, None) => {
                    return Err(LedgerError::validation(
                        "a payment from a farmer needs a farmer",
                    ));
                }
            };
            store::get_farmer(&tx, farmer_id)?;
            (None, Some(farmer_id))
        }
    };

    let mut payment = Payment {
        id: 0,
        payment_type: input.payment_type,
        business_source: input.business_source,
        owner_id,
        farmer_id,
        job_id: input.job_id,
        date: input.date,
        gross_amount: input.gross_amount,
        discount_amount: input.discount_amount,
        amount,
        status: input.status,
        note: input.note,
    };
    payment.id = store::insert_payment(&tx, &payment)?;
    apply_payment_delta(&tx, &payment, ledger::payment_delta(&payment))?;
    tx.commit()?;
    tracing::info!(
        payment_id = payment.id,
        kind = %payment.payment_type,
        source = %payment.business_source,
        amount = %payment.amount,
        status = %payment.status,
        "payment created"
    );
    Ok(payment)
}

/// Removes a payment, reversing exactly the net amount it settled.
pub fn delete_payment(conn: &mut Connection, id: i64) -> LedgerResult<Payment> {
    let tx = write_tx(conn)?;
    let payment = store::get_payment(&tx, id)?;
    apply_payment_delta(&tx, &payment, -ledger::payment_delta(&payment))?;
    store::delete_payment(&tx, id)?;
    tx.commit()?;
    tracing::info!(payment_id = id, amount = %payment.amount, "payment deleted");
    Ok(payment)
}

/// Marks a pending payment completed and applies its settlement once.
pub fn complete_payment(conn: &mut Connection, id: i64) -> LedgerResult<Payment> {
    let tx = write_tx(conn)?;
    let mut payment = store::get_payment(&tx, id)?;
    if payment.status == PaymentStatus::Completed {
        return Err(LedgerError::validation(format!(
            "payment {} is already completed",
            id
        )));
    }
    payment.status = PaymentStatus::Completed;
    store::set_payment_status(&tx, id, payment.status)?;
    apply_payment_delta(&tx, &payment, ledger::payment_delta(&payment))?;
    tx.commit()?;
    tracing::info!(payment_id = id, amount = %payment.amount, "payment completed");
    Ok(payment)
}

fn apply_payment_delta(conn: &Connection, payment: &Payment, delta: Delta) -> LedgerResult<()> {
    if delta.is_zero() {
        return Ok(());
    }
    match (payment.payment_type, payment.owner_id, payment.farmer_id) {
        (PaymentType::ToMachineOwner, Some(owner_id), _) => match payment.business_source {
            BusinessSource::Harvesting => store::apply_owner_delta(conn, owner_id, delta),
            BusinessSource::Rental => store::apply_owner_rental_delta(conn, owner_id, delta),
        },
        (PaymentType::FromFarmer, _, Some(farmer_id)) => {
            store::apply_farmer_delta(conn, farmer_id, delta)
        }
        _ => Err(LedgerError::validation(format!(
            "payment {} has no party to settle",
            payment.id
        ))),
    }
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let payment_type = match sub.get_one::<String>("to").map(String::as_str) {
        Some("owner") => PaymentType::ToMachineOwner,
        _ => PaymentType::FromFarmer,
    };
    let business_source = sub
        .get_one::<String>("source")
        .map(|s| s.parse::<BusinessSource>())
        .transpose()?
        .unwrap_or(BusinessSource::Harvesting);
    let status = if sub.get_flag("pending") {
        PaymentStatus::Pending
    } else {
        PaymentStatus::Completed
    };
    let input = NewPayment {
        payment_type,
        business_source,
        owner_id: sub.get_one::<i64>("owner").copied(),
        farmer_id: sub.get_one::<i64>("farmer").copied(),
        job_id: sub.get_one::<i64>("job").copied(),
        date: parse_date(sub.get_one::<String>("date").unwrap())?,
        gross_amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        discount_amount: decimal_arg(sub, "discount")?,
        status,
        note: opt_text_arg(sub, "note"),
    };
    let p = create_payment(conn, input)?;
    println!(
        "Recorded payment {} ({}, {}) net {} [{}]",
        p.id,
        p.payment_type,
        p.business_source,
        fmt_amount(&p.amount),
        p.status
    );
    Ok(())
}

#[derive(Serialize)]
pub struct PaymentRow {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub business_source: String,
    pub party: String,
    pub job_id: Option<i64>,
    pub gross_amount: String,
    pub discount_amount: String,
    pub amount: String,
    pub status: String,
}

pub fn payment_rows(conn: &Connection) -> Result<Vec<PaymentRow>> {
    let payments = store::list_payments(conn)?;
    Ok(payments
        .iter()
        .map(|p| PaymentRow {
            id: p.id,
            date: p.date.to_string(),
            payment_type: p.payment_type.to_string(),
            business_source: p.business_source.to_string(),
            party: match (p.owner_id, p.farmer_id) {
                (Some(o), _) => format!("owner {}", o),
                (_, Some(f)) => format!("farmer {}", f),
                _ => String::new(),
            },
            job_id: p.job_id,
            gross_amount: fmt_amount(&p.gross_amount),
            discount_amount: fmt_amount(&p.discount_amount),
            amount: fmt_amount(&p.amount),
            status: p.status.to_string(),
        })
        .collect())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = payment_rows(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date,
                    r.payment_type,
                    r.business_source,
                    r.party,
                    r.job_id.map(|j| j.to_string()).unwrap_or_default(),
                    r.gross_amount,
                    r.discount_amount,
                    r.amount,
                    r.status,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Date", "Type", "Source", "Party", "Job", "Gross", "Discount", "Net",
                    "Status",
                ],
                rows,
            )
        );
    }
    Ok(())
}
