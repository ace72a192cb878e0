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

use crate::balances::ConsistencyWarning;
use crate::db::write_tx;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{self, JobDeltas};
use crate::models::{HarvestingJob, PaymentType};
use crate::store;
use crate::utils::{
    decimal_arg, fmt_amount, maybe_print_json, opt_decimal_arg, opt_text_arg, parse_date,
    parse_decimal, pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub farmer_id: i64,
    pub machine_id: i64,
    pub date: NaiveDate,
    pub hours: Decimal,
    /// Defaults to the machine's farmer-facing rate.
    pub rate_per_hour: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub advance_from_farmer: Decimal,
    pub discount_to_farmer: Decimal,
    pub discount_from_owner: Decimal,
    pub note: Option<String>,
}

/// Fields of a job that may be changed after booking. `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub farmer_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub hours: Option<Decimal>,
    pub rate_per_hour: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub advance_from_farmer: Option<Decimal>,
    pub discount_to_farmer: Option<Decimal>,
    pub discount_from_owner: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JobRemoval {
    pub job: HarvestingJob,
    /// Set when the machine's rate moved since the job was booked.
    pub rate_warning: Option<ConsistencyWarning>,
}

pub fn create_job(conn: &mut Connection, input: NewJob) -> LedgerResult<HarvestingJob> {
    let tx = write_tx(conn)?;
    let job = create_job_in(&tx, input)?;
    tx.commit()?;
    Ok(job)
}

/// Books a job inside a caller-owned transaction.
///
/// Net amounts are priced with the machine's current owner rate and frozen
/// on the job; Machine, Owner and Farmer pending totals then move by those
/// nets, in that order.
pub fn create_job_in(conn: &Connection, input: NewJob) -> LedgerResult<HarvestingJob> {
    let machine = store::get_machine(conn, input.machine_id)?;
    store::get_farmer(conn, input.farmer_id)?;

    let mut job = HarvestingJob {
        id: 0,
        farmer_id: input.farmer_id,
        machine_id: input.machine_id,
        date: input.date,
        hours: input.hours,
        rate_per_hour: input.rate_per_hour.unwrap_or(machine.rate_per_hour),
        total_amount: input.total_amount,
        owner_rate_per_hour: machine.owner_rate_per_hour,
        advance_from_farmer: input.advance_from_farmer,
        discount_to_farmer: input.discount_to_farmer,
        discount_from_owner: input.discount_from_owner,
        net_amount_from_farmer: Decimal::ZERO,
        net_owner_amount: Decimal::ZERO,
        note: input.note,
    };
    ledger::validate_job(&job, &machine)?;
    ledger::price_job(&mut job, &machine);

    job.id = store::insert_job(conn, &job)?;
    apply_job_deltas(conn, &job, machine.owner_id, ledger::job_deltas(&job))?;
    tracing::info!(
        job_id = job.id,
        machine_id = job.machine_id,
        farmer_id = job.farmer_id,
        net_owner = %job.net_owner_amount,
        net_farmer = %job.net_amount_from_farmer,
        "job created"
    );
    Ok(job)
}

/// Re-prices a job and moves running totals by the difference.
///
/// The old deltas are reversed on the old machine/owner/farmer and the new
/// ones applied to the new ones, so a patch touching any amount keeps every
/// running total equal to its recomputation. The frozen owner rate is kept
/// unless the job moves to another machine. A job whose payments name it
/// keeps its farmer, and its owner, while those payments exist.
pub fn update_job(conn: &mut Connection, id: i64, patch: JobPatch) -> LedgerResult<HarvestingJob> {
    let tx = write_tx(conn)?;
    let old = store::get_job(&tx, id)?;
    let old_machine = store::get_machine(&tx, old.machine_id)?;

    let mut job = old.clone();
    let new_machine = match patch.machine_id {
        Some(mid) if mid != old.machine_id => store::get_machine(&tx, mid)?,
        _ => old_machine.clone(),
    };
    if let Some(fid) = patch.farmer_id {
        store::get_farmer(&tx, fid)?;
        job.farmer_id = fid;
    }
    job.machine_id = new_machine.id;
    if let Some(v) = patch.date {
        job.date = v;
    }
    if let Some(v) = patch.hours {
        job.hours = v;
    }
    if let Some(v) = patch.rate_per_hour {
        job.rate_per_hour = v;
    }
    if let Some(v) = patch.total_amount {
        job.total_amount = Some(v);
    }
    if let Some(v) = patch.advance_from_farmer {
        job.advance_from_farmer = v;
    }
    if let Some(v) = patch.discount_to_farmer {
        job.discount_to_farmer = v;
    }
    if let Some(v) = patch.discount_from_owner {
        job.discount_from_owner = v;
    }
    if patch.note.is_some() {
        job.note = patch.note;
    }

    if job.farmer_id != old.farmer_id
        && store::count_job_payments(&tx, id, PaymentType::FromFarmer)? > 0
    {
        return Err(LedgerError::validation(format!(
            "job {} has farmer payments; remove them before changing its farmer",
            id
        )));
    }
    if new_machine.owner_id != old_machine.owner_id
        && store::count_job_payments(&tx, id, PaymentType::ToMachineOwner)? > 0
    {
        return Err(LedgerError::validation(format!(
            "job {} has owner payments; remove them before changing its owner",
            id
        )));
    }

    let rate = if new_machine.id == old.machine_id {
        old.owner_rate_per_hour
    } else {
        new_machine.owner_rate_per_hour
    };
    ledger::validate_job(&job, &rate)?;
    ledger::price_job(&mut job, &rate);

    store::update_job(&tx, &job)?;
    apply_job_deltas(&tx, &old, old_machine.owner_id, -ledger::job_deltas(&old))?;
    apply_job_deltas(&tx, &job, new_machine.owner_id, ledger::job_deltas(&job))?;
    tx.commit()?;
    tracing::info!(
        job_id = id,
        net_owner = %job.net_owner_amount,
        net_farmer = %job.net_amount_from_farmer,
        "job updated"
    );
    Ok(job)
}

/// Deletes a job and reverses exactly the deltas it applied.
///
/// Reversal uses the amounts frozen on the job. If the machine's owner rate
/// has changed since booking, the divergence is reported as a warning; the
/// frozen amounts are still what gets reversed.
pub fn delete_job(conn: &mut Connection, id: i64) -> LedgerResult<JobRemoval> {
    let tx = write_tx(conn)?;
    let job = store::get_job(&tx, id)?;
    let machine = store::get_machine(&tx, job.machine_id)?;

    let rate_warning = (machine.owner_rate_per_hour != job.owner_rate_per_hour).then(|| {
        ConsistencyWarning::new(
            format!("job {} on machine {}", job.id, machine.id),
            "owner_rate_per_hour",
            job.owner_rate_per_hour,
            machine.owner_rate_per_hour,
        )
    });

    apply_job_deltas(&tx, &job, machine.owner_id, -ledger::job_deltas(&job))?;
    store::delete_job(&tx, id)?;
    tx.commit()?;
    tracing::info!(job_id = id, reversed_owner = %job.net_owner_amount, "job deleted");
    Ok(JobRemoval { job, rate_warning })
}

fn apply_job_deltas(
    conn: &Connection,
    job: &HarvestingJob,
    owner_id: i64,
    deltas: JobDeltas,
) -> LedgerResult<()> {
    store::apply_machine_pending(conn, job.machine_id, deltas.machine_pending)?;
    store::apply_owner_delta(conn, owner_id, deltas.owner)?;
    store::apply_farmer_delta(conn, job.farmer_id, deltas.farmer)?;
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = NewJob {
        farmer_id: *sub.get_one::<i64>("farmer").unwrap(),
        machine_id: *sub.get_one::<i64>("machine").unwrap(),
        date: parse_date(sub.get_one::<String>("date").unwrap())?,
        hours: parse_decimal(sub.get_one::<String>("hours").unwrap())?,
        rate_per_hour: opt_decimal_arg(sub, "rate")?,
        total_amount: opt_decimal_arg(sub, "total")?,
        advance_from_farmer: decimal_arg(sub, "advance")?,
        discount_to_farmer: decimal_arg(sub, "farmer_discount")?,
        discount_from_owner: decimal_arg(sub, "owner_discount")?,
        note: opt_text_arg(sub, "note"),
    };
    let job = create_job(conn, input)?;
    println!(
        "Recorded job {}: farmer owes {}, owner due {}",
        job.id,
        fmt_amount(&job.net_amount_from_farmer),
        fmt_amount(&job.net_owner_amount)
    );
    Ok(())
}

fn update(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let patch = JobPatch {
        farmer_id: sub.get_one::<i64>("farmer").copied(),
        machine_id: sub.get_one::<i64>("machine").copied(),
        date: sub
            .get_one::<String>("date")
            .map(|d| parse_date(d))
            .transpose()?,
        hours: opt_decimal_arg(sub, "hours")?,
        rate_per_hour: opt_decimal_arg(sub, "rate")?,
        total_amount: opt_decimal_arg(sub, "total")?,
        advance_from_farmer: opt_decimal_arg(sub, "advance")?,
        discount_to_farmer: opt_decimal_arg(sub, "farmer_discount")?,
        discount_from_owner: opt_decimal_arg(sub, "owner_discount")?,
        note: opt_text_arg(sub, "note"),
    };
    let job = update_job(conn, id, patch)?;
    println!(
        "Updated job {}: farmer owes {}, owner due {}",
        job.id,
        fmt_amount(&job.net_amount_from_farmer),
        fmt_amount(&job.net_owner_amount)
    );
    Ok(())
}

fn rm(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let removed = delete_job(conn, id)?;
    if let Some(w) = &removed.rate_warning {
        eprintln!("warning: {}", w);
    }
    println!("Removed job {}", removed.job.id);
    Ok(())
}

#[derive(Serialize)]
pub struct JobRow {
    pub id: i64,
    pub date: String,
    pub farmer_id: i64,
    pub machine_id: i64,
    pub hours: String,
    pub gross_farmer: String,
    pub net_farmer: String,
    pub net_owner: String,
    pub advance: String,
}

pub fn job_rows(
    conn: &Connection,
    machine_id: Option<i64>,
    village: Option<&str>,
) -> Result<Vec<JobRow>> {
    let jobs = store::list_jobs(conn, machine_id, village)?;
    Ok(jobs
        .iter()
        .map(|j| JobRow {
            id: j.id,
            date: j.date.to_string(),
            farmer_id: j.farmer_id,
            machine_id: j.machine_id,
            hours: j.hours.to_string(),
            gross_farmer: fmt_amount(&ledger::gross_farmer_amount(j)),
            net_farmer: fmt_amount(&j.net_amount_from_farmer),
            net_owner: fmt_amount(&j.net_owner_amount),
            advance: fmt_amount(&j.advance_from_farmer),
        })
        .collect())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let village = opt_text_arg(sub, "village");
    let data = job_rows(conn, sub.get_one::<i64>("machine").copied(), village.as_deref())?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date,
                    r.farmer_id.to_string(),
                    r.machine_id.to_string(),
                    r.hours,
                    r.gross_farmer,
                    r.net_farmer,
                    r.net_owner,
                    r.advance,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Date", "Farmer", "Machine", "Hours", "Gross", "Net (farmer)",
                    "Net (owner)", "Advance",
                ],
                rows,
            )
        );
    }
    Ok(())
}
