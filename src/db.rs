// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fs;
use std::path::PathBuf;

use crate::error::LedgerResult;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Harvestledger", "harvestledger"));

pub const DB_ENV: &str = "HARVESTLEDGER_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Some(custom) = std::env::var_os(DB_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(custom));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("harvestledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

/// Opens the write transaction every lifecycle operation runs in.
///
/// `IMMEDIATE` takes SQLite's writer lock up front, so the read-modify-write
/// of running totals cannot interleave with another writer, and dropping the
/// transaction on an error rolls back every write made so far.
pub fn write_tx(conn: &mut Connection) -> LedgerResult<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS owners(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT,
        owner_rate_per_hour TEXT NOT NULL DEFAULT '0',
        total_amount_pending TEXT NOT NULL DEFAULT '0',
        total_amount_paid TEXT NOT NULL DEFAULT '0',
        total_advances_given TEXT NOT NULL DEFAULT '0',
        rental_amount_pending TEXT NOT NULL DEFAULT '0',
        rental_amount_paid TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS machines(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        machine_type TEXT,
        rate_per_hour TEXT NOT NULL DEFAULT '0',
        owner_rate_per_hour TEXT NOT NULL DEFAULT '0',
        total_amount_pending TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(owner_id) REFERENCES owners(id) ON DELETE RESTRICT
    );
    CREATE INDEX IF NOT EXISTS idx_machines_owner ON machines(owner_id);

    CREATE TABLE IF NOT EXISTS farmers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        village TEXT,
        phone TEXT,
        total_amount_pending TEXT NOT NULL DEFAULT '0',
        total_amount_paid TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS dealers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        village TEXT,
        phone TEXT,
        total_amount_pending TEXT NOT NULL DEFAULT '0',
        total_amount_paid TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS harvesting_jobs(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        farmer_id INTEGER NOT NULL,
        machine_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        hours TEXT NOT NULL,
        rate_per_hour TEXT NOT NULL,
        total_amount TEXT,
        owner_rate_per_hour TEXT NOT NULL,
        advance_from_farmer TEXT NOT NULL DEFAULT '0',
        discount_to_farmer TEXT NOT NULL DEFAULT '0',
        discount_from_owner TEXT NOT NULL DEFAULT '0',
        net_amount_from_farmer TEXT NOT NULL,
        net_owner_amount TEXT NOT NULL,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(farmer_id) REFERENCES farmers(id) ON DELETE RESTRICT,
        FOREIGN KEY(machine_id) REFERENCES machines(id) ON DELETE RESTRICT
    );
    CREATE INDEX IF NOT EXISTS idx_jobs_machine ON harvesting_jobs(machine_id);
    CREATE INDEX IF NOT EXISTS idx_jobs_farmer ON harvesting_jobs(farmer_id);

    CREATE TABLE IF NOT EXISTS machine_rentals(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        dealer_id INTEGER NOT NULL,
        machine_id INTEGER NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT,
        total_hours_used TEXT NOT NULL DEFAULT '0',
        hourly_rate_to_dealer TEXT NOT NULL,
        hourly_cost_from_owner TEXT NOT NULL,
        total_amount_charged TEXT NOT NULL,
        total_cost_to_owner TEXT NOT NULL,
        profit_margin TEXT NOT NULL,
        advance_paid TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL CHECK(status IN ('Active','Completed')),
        FOREIGN KEY(dealer_id) REFERENCES dealers(id) ON DELETE RESTRICT,
        FOREIGN KEY(machine_id) REFERENCES machines(id) ON DELETE RESTRICT
    );

    CREATE TABLE IF NOT EXISTS payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL CHECK(type IN ('To Machine Owner','From Farmer')),
        business_source TEXT NOT NULL CHECK(business_source IN ('harvesting','rental')),
        owner_id INTEGER,
        farmer_id INTEGER,
        job_id INTEGER,
        date TEXT NOT NULL,
        gross_amount TEXT NOT NULL,
        discount_amount TEXT NOT NULL DEFAULT '0',
        amount TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('Completed','Pending')),
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(owner_id) REFERENCES owners(id) ON DELETE RESTRICT,
        FOREIGN KEY(farmer_id) REFERENCES farmers(id) ON DELETE RESTRICT,
        FOREIGN KEY(job_id) REFERENCES harvesting_jobs(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_payments_owner ON payments(owner_id);
    CREATE INDEX IF NOT EXISTS idx_payments_farmer ON payments(farmer_id);

    CREATE TABLE IF NOT EXISTS rental_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rental_id INTEGER NOT NULL,
        dealer_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('Completed','Pending')),
        note TEXT,
        FOREIGN KEY(rental_id) REFERENCES machine_rentals(id) ON DELETE RESTRICT,
        FOREIGN KEY(dealer_id) REFERENCES dealers(id) ON DELETE RESTRICT
    );

    CREATE TABLE IF NOT EXISTS daily_expenses(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        machine_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        description TEXT,
        FOREIGN KEY(machine_id) REFERENCES machines(id) ON DELETE RESTRICT
    );

    CREATE TABLE IF NOT EXISTS daily_advances(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        machine_id INTEGER,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        note TEXT,
        FOREIGN KEY(owner_id) REFERENCES owners(id) ON DELETE RESTRICT,
        FOREIGN KEY(machine_id) REFERENCES machines(id) ON DELETE SET NULL
    );
    "#,
    )
}
