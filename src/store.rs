// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Typed reads and writes against the SQLite store.
//!
//! Nothing here knows any business rule; lifecycle code in `commands`
//! decides which rows to touch and by how much.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Delta;
use crate::models::{
    DailyAdvance, DailyExpense, Dealer, Farmer, HarvestingJob, Machine, MachineRental, Owner,
    Payment, PaymentStatus, PaymentType, RentalPayment, RentalStatus,
};

fn dec(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_dec(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        _ => Ok(None),
    }
}

fn label<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = LedgerError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn found<T>(value: Option<T>, entity: &'static str, id: i64) -> LedgerResult<T> {
    value.ok_or_else(|| LedgerError::not_found(entity, id))
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> LedgerResult<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ---- owners ----

const OWNER_COLS: &str = "id, name, phone, owner_rate_per_hour, total_amount_pending, \
     total_amount_paid, total_advances_given, rental_amount_pending, rental_amount_paid";

fn owner_row(r: &Row<'_>) -> rusqlite::Result<Owner> {
    Ok(Owner {
        id: r.get(0)?,
        name: r.get(1)?,
        phone: r.get(2)?,
        owner_rate_per_hour: dec(r, 3)?,
        total_amount_pending: dec(r, 4)?,
        total_amount_paid: dec(r, 5)?,
        total_advances_given: dec(r, 6)?,
        rental_amount_pending: dec(r, 7)?,
        rental_amount_paid: dec(r, 8)?,
    })
}

pub fn get_owner(conn: &Connection, id: i64) -> LedgerResult<Owner> {
    let sql = format!("SELECT {OWNER_COLS} FROM owners WHERE id=?1");
    let owner = conn.query_row(&sql, params![id], owner_row).optional()?;
    found(owner, "Owner", id)
}

pub fn list_owners(conn: &Connection) -> LedgerResult<Vec<Owner>> {
    let mut stmt = conn.prepare(&format!("SELECT {OWNER_COLS} FROM owners ORDER BY name, id"))?;
    let rows = stmt.query_map([], owner_row)?;
    collect(rows)
}

pub fn insert_owner(
    conn: &Connection,
    name: &str,
    phone: Option<&str>,
    owner_rate_per_hour: Decimal,
) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO owners(name, phone, owner_rate_per_hour) VALUES (?1, ?2, ?3)",
        params![name, phone, owner_rate_per_hour.to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---- machines ----

const MACHINE_COLS: &str =
    "id, owner_id, name, machine_type, rate_per_hour, owner_rate_per_hour, total_amount_pending";

fn machine_row(r: &Row<'_>) -> rusqlite::Result<Machine> {
    Ok(Machine {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        name: r.get(2)?,
        machine_type: r.get(3)?,
        rate_per_hour: dec(r, 4)?,
        owner_rate_per_hour: dec(r, 5)?,
        total_amount_pending: dec(r, 6)?,
    })
}

pub fn get_machine(conn: &Connection, id: i64) -> LedgerResult<Machine> {
    let sql = format!("SELECT {MACHINE_COLS} FROM machines WHERE id=?1");
    let machine = conn.query_row(&sql, params![id], machine_row).optional()?;
    found(machine, "Machine", id)
}

pub fn list_machines(conn: &Connection) -> LedgerResult<Vec<Machine>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {MACHINE_COLS} FROM machines ORDER BY name, id"))?;
    let rows = stmt.query_map([], machine_row)?;
    collect(rows)
}

pub fn insert_machine(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    machine_type: Option<&str>,
    rate_per_hour: Decimal,
    owner_rate_per_hour: Decimal,
) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO machines(owner_id, name, machine_type, rate_per_hour, owner_rate_per_hour)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            owner_id,
            name,
            machine_type,
            rate_per_hour.to_string(),
            owner_rate_per_hour.to_string()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_machine_rates(
    conn: &Connection,
    id: i64,
    rate_per_hour: Decimal,
    owner_rate_per_hour: Decimal,
) -> LedgerResult<()> {
    let n = conn.execute(
        "UPDATE machines SET rate_per_hour=?2, owner_rate_per_hour=?3 WHERE id=?1",
        params![id, rate_per_hour.to_string(), owner_rate_per_hour.to_string()],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("Machine", id));
    }
    Ok(())
}

// ---- farmers / dealers ----

const PARTY_COLS: &str = "id, name, village, phone, total_amount_pending, total_amount_paid";

fn farmer_row(r: &Row<'_>) -> rusqlite::Result<Farmer> {
    Ok(Farmer {
        id: r.get(0)?,
        name: r.get(1)?,
        village: r.get(2)?,
        phone: r.get(3)?,
        total_amount_pending: dec(r, 4)?,
        total_amount_paid: dec(r, 5)?,
    })
}

fn dealer_row(r: &Row<'_>) -> rusqlite::Result<Dealer> {
    Ok(Dealer {
        id: r.get(0)?,
        name: r.get(1)?,
        village: r.get(2)?,
        phone: r.get(3)?,
        total_amount_pending: dec(r, 4)?,
        total_amount_paid: dec(r, 5)?,
    })
}

pub fn get_farmer(conn: &Connection, id: i64) -> LedgerResult<Farmer> {
    let sql = format!("SELECT {PARTY_COLS} FROM farmers WHERE id=?1");
    let farmer = conn.query_row(&sql, params![id], farmer_row).optional()?;
    found(farmer, "Farmer", id)
}

pub fn list_farmers(conn: &Connection) -> LedgerResult<Vec<Farmer>> {
    let mut stmt = conn.prepare(&format!("SELECT {PARTY_COLS} FROM farmers ORDER BY name, id"))?;
    let rows = stmt.query_map([], farmer_row)?;
    collect(rows)
}

pub fn insert_farmer(
    conn: &Connection,
    name: &str,
    village: Option<&str>,
    phone: Option<&str>,
) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO farmers(name, village, phone) VALUES (?1, ?2, ?3)",
        params![name, village, phone],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_dealer(conn: &Connection, id: i64) -> LedgerResult<Dealer> {
    let sql = format!("SELECT {PARTY_COLS} FROM dealers WHERE id=?1");
    let dealer = conn.query_row(&sql, params![id], dealer_row).optional()?;
    found(dealer, "Dealer", id)
}

pub fn list_dealers(conn: &Connection) -> LedgerResult<Vec<Dealer>> {
    let mut stmt = conn.prepare(&format!("SELECT {PARTY_COLS} FROM dealers ORDER BY name, id"))?;
    let rows = stmt.query_map([], dealer_row)?;
    collect(rows)
}

pub fn insert_dealer(
    conn: &Connection,
    name: &str,
    village: Option<&str>,
    phone: Option<&str>,
) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO dealers(name, village, phone) VALUES (?1, ?2, ?3)",
        params![name, village, phone],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---- harvesting jobs ----

const JOB_COLS: &str = "j.id, j.farmer_id, j.machine_id, j.date, j.hours, j.rate_per_hour, \
     j.total_amount, j.owner_rate_per_hour, j.advance_from_farmer, j.discount_to_farmer, \
     j.discount_from_owner, j.net_amount_from_farmer, j.net_owner_amount, j.note";

fn job_row(r: &Row<'_>) -> rusqlite::Result<HarvestingJob> {
    Ok(HarvestingJob {
        id: r.get(0)?,
        farmer_id: r.get(1)?,
        machine_id: r.get(2)?,
        date: r.get::<_, NaiveDate>(3)?,
        hours: dec(r, 4)?,
        rate_per_hour: dec(r, 5)?,
        total_amount: opt_dec(r, 6)?,
        owner_rate_per_hour: dec(r, 7)?,
        advance_from_farmer: dec(r, 8)?,
        discount_to_farmer: dec(r, 9)?,
        discount_from_owner: dec(r, 10)?,
        net_amount_from_farmer: dec(r, 11)?,
        net_owner_amount: dec(r, 12)?,
        note: r.get(13)?,
    })
}

pub fn get_job(conn: &Connection, id: i64) -> LedgerResult<HarvestingJob> {
    let sql = format!("SELECT {JOB_COLS} FROM harvesting_jobs j WHERE j.id=?1");
    let job = conn.query_row(&sql, params![id], job_row).optional()?;
    found(job, "HarvestingJob", id)
}

/// Jobs, optionally narrowed to one machine and/or the farmer's village.
pub fn list_jobs(
    conn: &Connection,
    machine_id: Option<i64>,
    village: Option<&str>,
) -> LedgerResult<Vec<HarvestingJob>> {
    let sql = format!(
        "SELECT {JOB_COLS} FROM harvesting_jobs j JOIN farmers f ON f.id=j.farmer_id
         WHERE (?1 IS NULL OR j.machine_id=?1)
           AND (?2 IS NULL OR f.village=?2 COLLATE NOCASE)
         ORDER BY j.date, j.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![machine_id, village], job_row)?;
    collect(rows)
}

pub fn insert_job(conn: &Connection, job: &HarvestingJob) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO harvesting_jobs(farmer_id, machine_id, date, hours, rate_per_hour,
            total_amount, owner_rate_per_hour, advance_from_farmer, discount_to_farmer,
            discount_from_owner, net_amount_from_farmer, net_owner_amount, note)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        params![
            job.farmer_id,
            job.machine_id,
            job.date,
            job.hours.to_string(),
            job.rate_per_hour.to_string(),
            job.total_amount.map(|d| d.to_string()),
            job.owner_rate_per_hour.to_string(),
            job.advance_from_farmer.to_string(),
            job.discount_to_farmer.to_string(),
            job.discount_from_owner.to_string(),
            job.net_amount_from_farmer.to_string(),
            job.net_owner_amount.to_string(),
            job.note
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_job(conn: &Connection, job: &HarvestingJob) -> LedgerResult<()> {
    let n = conn.execute(
        "UPDATE harvesting_jobs SET farmer_id=?2, machine_id=?3, date=?4, hours=?5,
            rate_per_hour=?6, total_amount=?7, owner_rate_per_hour=?8, advance_from_farmer=?9,
            discount_to_farmer=?10, discount_from_owner=?11, net_amount_from_farmer=?12,
            net_owner_amount=?13, note=?14
         WHERE id=?1",
        params![
            job.id,
            job.farmer_id,
            job.machine_id,
            job.date,
            job.hours.to_string(),
            job.rate_per_hour.to_string(),
            job.total_amount.map(|d| d.to_string()),
            job.owner_rate_per_hour.to_string(),
            job.advance_from_farmer.to_string(),
            job.discount_to_farmer.to_string(),
            job.discount_from_owner.to_string(),
            job.net_amount_from_farmer.to_string(),
            job.net_owner_amount.to_string(),
            job.note
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("HarvestingJob", job.id));
    }
    Ok(())
}

pub fn delete_job(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM harvesting_jobs WHERE id=?1", params![id])?;
    Ok(())
}

// ---- rentals ----

const RENTAL_COLS: &str = "r.id, r.dealer_id, r.machine_id, r.start_date, r.end_date, \
     r.total_hours_used, r.hourly_rate_to_dealer, r.hourly_cost_from_owner, \
     r.total_amount_charged, r.total_cost_to_owner, r.profit_margin, r.advance_paid, r.status";

fn rental_row(r: &Row<'_>) -> rusqlite::Result<MachineRental> {
    Ok(MachineRental {
        id: r.get(0)?,
        dealer_id: r.get(1)?,
        machine_id: r.get(2)?,
        start_date: r.get::<_, NaiveDate>(3)?,
        end_date: r.get::<_, Option<NaiveDate>>(4)?,
        total_hours_used: dec(r, 5)?,
        hourly_rate_to_dealer: dec(r, 6)?,
        hourly_cost_from_owner: dec(r, 7)?,
        total_amount_charged: dec(r, 8)?,
        total_cost_to_owner: dec(r, 9)?,
        profit_margin: dec(r, 10)?,
        advance_paid: dec(r, 11)?,
        status: label::<RentalStatus>(r, 12)?,
    })
}

pub fn get_rental(conn: &Connection, id: i64) -> LedgerResult<MachineRental> {
    let sql = format!("SELECT {RENTAL_COLS} FROM machine_rentals r WHERE r.id=?1");
    let rental = conn.query_row(&sql, params![id], rental_row).optional()?;
    found(rental, "MachineRental", id)
}

/// Rentals, optionally narrowed to one machine and/or the dealer's village.
pub fn list_rentals(
    conn: &Connection,
    machine_id: Option<i64>,
    village: Option<&str>,
) -> LedgerResult<Vec<MachineRental>> {
    let sql = format!(
        "SELECT {RENTAL_COLS} FROM machine_rentals r JOIN dealers d ON d.id=r.dealer_id
         WHERE (?1 IS NULL OR r.machine_id=?1)
           AND (?2 IS NULL OR d.village=?2 COLLATE NOCASE)
         ORDER BY r.start_date, r.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![machine_id, village], rental_row)?;
    collect(rows)
}

pub fn insert_rental(conn: &Connection, rental: &MachineRental) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO machine_rentals(dealer_id, machine_id, start_date, end_date,
            total_hours_used, hourly_rate_to_dealer, hourly_cost_from_owner,
            total_amount_charged, total_cost_to_owner, profit_margin, advance_paid, status)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        params![
            rental.dealer_id,
            rental.machine_id,
            rental.start_date,
            rental.end_date,
            rental.total_hours_used.to_string(),
            rental.hourly_rate_to_dealer.to_string(),
            rental.hourly_cost_from_owner.to_string(),
            rental.total_amount_charged.to_string(),
            rental.total_cost_to_owner.to_string(),
            rental.profit_margin.to_string(),
            rental.advance_paid.to_string(),
            rental.status.as_str()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_rental(conn: &Connection, rental: &MachineRental) -> LedgerResult<()> {
    let n = conn.execute(
        "UPDATE machine_rentals SET end_date=?2, total_hours_used=?3, hourly_rate_to_dealer=?4,
            hourly_cost_from_owner=?5, total_amount_charged=?6, total_cost_to_owner=?7,
            profit_margin=?8, advance_paid=?9, status=?10
         WHERE id=?1",
        params![
            rental.id,
            rental.end_date,
            rental.total_hours_used.to_string(),
            rental.hourly_rate_to_dealer.to_string(),
            rental.hourly_cost_from_owner.to_string(),
            rental.total_amount_charged.to_string(),
            rental.total_cost_to_owner.to_string(),
            rental.profit_margin.to_string(),
            rental.advance_paid.to_string(),
            rental.status.as_str()
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("MachineRental", rental.id));
    }
    Ok(())
}

pub fn delete_rental(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM machine_rentals WHERE id=?1", params![id])?;
    Ok(())
}

// ---- payments ----

const PAYMENT_COLS: &str = "id, type, business_source, owner_id, farmer_id, job_id, date, \
     gross_amount, discount_amount, amount, status, note";

fn payment_row(r: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: r.get(0)?,
        payment_type: label(r, 1)?,
        business_source: label(r, 2)?,
        owner_id: r.get(3)?,
        farmer_id: r.get(4)?,
        job_id: r.get(5)?,
        date: r.get::<_, NaiveDate>(6)?,
        gross_amount: dec(r, 7)?,
        discount_amount: dec(r, 8)?,
        amount: dec(r, 9)?,
        status: label(r, 10)?,
        note: r.get(11)?,
    })
}

pub fn get_payment(conn: &Connection, id: i64) -> LedgerResult<Payment> {
    let sql = format!("SELECT {PAYMENT_COLS} FROM payments WHERE id=?1");
    let payment = conn.query_row(&sql, params![id], payment_row).optional()?;
    found(payment, "Payment", id)
}

pub fn list_payments(conn: &Connection) -> LedgerResult<Vec<Payment>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {PAYMENT_COLS} FROM payments ORDER BY date, id"))?;
    let rows = stmt.query_map([], payment_row)?;
    collect(rows)
}

/// Payments of one type that name `job_id`.
pub fn count_job_payments(
    conn: &Connection,
    job_id: i64,
    payment_type: PaymentType,
) -> LedgerResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE job_id=?1 AND type=?2",
        params![job_id, payment_type.as_str()],
        |r| r.get(0),
    )?)
}

pub fn insert_payment(conn: &Connection, p: &Payment) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO payments(type, business_source, owner_id, farmer_id, job_id, date,
            gross_amount, discount_amount, amount, status, note)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            p.payment_type.as_str(),
            p.business_source.as_str(),
            p.owner_id,
            p.farmer_id,
            p.job_id,
            p.date,
            p.gross_amount.to_string(),
            p.discount_amount.to_string(),
            p.amount.to_string(),
            p.status.as_str(),
            p.note
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_payment_status(conn: &Connection, id: i64, status: PaymentStatus) -> LedgerResult<()> {
    let n = conn.execute(
        "UPDATE payments SET status=?2 WHERE id=?1",
        params![id, status.as_str()],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("Payment", id));
    }
    Ok(())
}

pub fn delete_payment(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM payments WHERE id=?1", params![id])?;
    Ok(())
}

// ---- rental payments ----

const RENTAL_PAYMENT_COLS: &str = "id, rental_id, dealer_id, date, amount, status, note";

fn rental_payment_row(r: &Row<'_>) -> rusqlite::Result<RentalPayment> {
    Ok(RentalPayment {
        id: r.get(0)?,
        rental_id: r.get(1)?,
        dealer_id: r.get(2)?,
        date: r.get::<_, NaiveDate>(3)?,
        amount: dec(r, 4)?,
        status: label(r, 5)?,
        note: r.get(6)?,
    })
}

pub fn get_rental_payment(conn: &Connection, id: i64) -> LedgerResult<RentalPayment> {
    let sql = format!("SELECT {RENTAL_PAYMENT_COLS} FROM rental_payments WHERE id=?1");
    let payment = conn.query_row(&sql, params![id], rental_payment_row).optional()?;
    found(payment, "RentalPayment", id)
}

pub fn list_rental_payments(conn: &Connection) -> LedgerResult<Vec<RentalPayment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RENTAL_PAYMENT_COLS} FROM rental_payments ORDER BY date, id"
    ))?;
    let rows = stmt.query_map([], rental_payment_row)?;
    collect(rows)
}

pub fn count_rental_payments(conn: &Connection, rental_id: i64) -> LedgerResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM rental_payments WHERE rental_id=?1",
        params![rental_id],
        |r| r.get(0),
    )?)
}

pub fn insert_rental_payment(conn: &Connection, p: &RentalPayment) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO rental_payments(rental_id, dealer_id, date, amount, status, note)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            p.rental_id,
            p.dealer_id,
            p.date,
            p.amount.to_string(),
            p.status.as_str(),
            p.note
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_rental_payment_status(
    conn: &Connection,
    id: i64,
    status: PaymentStatus,
) -> LedgerResult<()> {
    let n = conn.execute(
        "UPDATE rental_payments SET status=?2 WHERE id=?1",
        params![id, status.as_str()],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("RentalPayment", id));
    }
    Ok(())
}

pub fn delete_rental_payment(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM rental_payments WHERE id=?1", params![id])?;
    Ok(())
}

// ---- expenses / advances ----

fn expense_row(r: &Row<'_>) -> rusqlite::Result<DailyExpense> {
    Ok(DailyExpense {
        id: r.get(0)?,
        machine_id: r.get(1)?,
        date: r.get::<_, NaiveDate>(2)?,
        amount: dec(r, 3)?,
        description: r.get(4)?,
    })
}

pub fn get_expense(conn: &Connection, id: i64) -> LedgerResult<DailyExpense> {
    let expense = conn
        .query_row(
            "SELECT id, machine_id, date, amount, description FROM daily_expenses WHERE id=?1",
            params![id],
            expense_row,
        )
        .optional()?;
    found(expense, "DailyExpense", id)
}

pub fn list_expenses(conn: &Connection) -> LedgerResult<Vec<DailyExpense>> {
    let mut stmt = conn.prepare(
        "SELECT id, machine_id, date, amount, description FROM daily_expenses ORDER BY date, id",
    )?;
    let rows = stmt.query_map([], expense_row)?;
    collect(rows)
}

pub fn insert_expense(conn: &Connection, e: &DailyExpense) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO daily_expenses(machine_id, date, amount, description) VALUES (?1,?2,?3,?4)",
        params![e.machine_id, e.date, e.amount.to_string(), e.description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_expense(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM daily_expenses WHERE id=?1", params![id])?;
    Ok(())
}

fn advance_row(r: &Row<'_>) -> rusqlite::Result<DailyAdvance> {
    Ok(DailyAdvance {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        machine_id: r.get(2)?,
        date: r.get::<_, NaiveDate>(3)?,
        amount: dec(r, 4)?,
        note: r.get(5)?,
    })
}

pub fn get_advance(conn: &Connection, id: i64) -> LedgerResult<DailyAdvance> {
    let advance = conn
        .query_row(
            "SELECT id, owner_id, machine_id, date, amount, note FROM daily_advances WHERE id=?1",
            params![id],
            advance_row,
        )
        .optional()?;
    found(advance, "DailyAdvance", id)
}

pub fn list_advances(conn: &Connection) -> LedgerResult<Vec<DailyAdvance>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, machine_id, date, amount, note FROM daily_advances ORDER BY date, id",
    )?;
    let rows = stmt.query_map([], advance_row)?;
    collect(rows)
}

pub fn insert_advance(conn: &Connection, a: &DailyAdvance) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO daily_advances(owner_id, machine_id, date, amount, note)
         VALUES (?1,?2,?3,?4,?5)",
        params![a.owner_id, a.machine_id, a.date, a.amount.to_string(), a.note],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_advance(conn: &Connection, id: i64) -> LedgerResult<()> {
    conn.execute("DELETE FROM daily_advances WHERE id=?1", params![id])?;
    Ok(())
}

// ---- running totals ----
//
// Every `apply_*` helper below must be called on a `db::write_tx`
// transaction.

/// Adds `changes` to decimal columns of one row.
///
/// This reads the current values and writes the sums back, so it is only
/// safe inside the operation's `db::write_tx`, which holds SQLite's writer
/// lock from before the read.
fn adjust(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
    changes: &[(&'static str, Decimal)],
) -> LedgerResult<()> {
    let changes: Vec<_> = changes.iter().filter(|(_, d)| !d.is_zero()).collect();
    if changes.is_empty() {
        return Ok(());
    }
    let cols: Vec<&str> = changes.iter().map(|(c, _)| *c).collect();
    let select = format!("SELECT {} FROM {} WHERE id=?1", cols.join(", "), table);
    let current = conn
        .query_row(&select, params![id], |r| {
            (0..cols.len()).map(|i| dec(r, i)).collect::<rusqlite::Result<Vec<_>>>()
        })
        .optional()?;
    let current = found(current, entity, id)?;

    let assignments: Vec<String> = cols
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}=?{}", c, i + 2))
        .collect();
    let update = format!("UPDATE {} SET {} WHERE id=?1", table, assignments.join(", "));
    let mut values: Vec<String> = Vec::with_capacity(cols.len() + 1);
    values.push(id.to_string());
    for ((col, delta), old) in changes.iter().zip(current) {
        let next = old.checked_add(*delta).ok_or_else(|| {
            LedgerError::validation(format!("{} {} {} would overflow", entity, id, col))
        })?;
        values.push(next.to_string());
    }
    conn.execute(&update, rusqlite::params_from_iter(values.iter()))?;
    Ok(())
}

pub fn apply_machine_pending(conn: &Connection, id: i64, amount: Decimal) -> LedgerResult<()> {
    adjust(conn, "machines", "Machine", id, &[("total_amount_pending", amount)])
}

pub fn apply_owner_delta(conn: &Connection, id: i64, delta: Delta) -> LedgerResult<()> {
    adjust(
        conn,
        "owners",
        "Owner",
        id,
        &[
            ("total_amount_pending", delta.pending),
            ("total_amount_paid", delta.paid),
        ],
    )
}

pub fn apply_owner_rental_delta(conn: &Connection, id: i64, delta: Delta) -> LedgerResult<()> {
    adjust(
        conn,
        "owners",
        "Owner",
        id,
        &[
            ("rental_amount_pending", delta.pending),
            ("rental_amount_paid", delta.paid),
        ],
    )
}

pub fn apply_owner_advance(conn: &Connection, id: i64, amount: Decimal) -> LedgerResult<()> {
    adjust(conn, "owners", "Owner", id, &[("total_advances_given", amount)])
}

pub fn apply_farmer_delta(conn: &Connection, id: i64, delta: Delta) -> LedgerResult<()> {
    adjust(
        conn,
        "farmers",
        "Farmer",
        id,
        &[
            ("total_amount_pending", delta.pending),
            ("total_amount_paid", delta.paid),
        ],
    )
}

pub fn apply_dealer_delta(conn: &Connection, id: i64, delta: Delta) -> LedgerResult<()> {
    adjust(
        conn,
        "dealers",
        "Dealer",
        id,
        &[
            ("total_amount_pending", delta.pending),
            ("total_amount_paid", delta.paid),
        ],
    )
}
