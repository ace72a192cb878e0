// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use harvestledger::{cli, commands, db, logging};

fn main() -> Result<()> {
    logging::init();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        Some(("owner", sub)) => commands::owners::handle(&conn, sub)?,
        Some(("machine", sub)) => commands::machines::handle(&conn, sub)?,
        Some(("farmer", sub)) => commands::parties::handle_farmers(&conn, sub)?,
        Some(("dealer", sub)) => commands::parties::handle_dealers(&conn, sub)?,
        Some(("job", sub)) => commands::jobs::handle(&mut conn, sub)?,
        Some(("pay", sub)) => commands::payments::handle(&mut conn, sub)?,
        Some(("rental", sub)) => commands::rentals::handle(&mut conn, sub)?,
        Some(("rental-pay", sub)) => commands::rentals::handle_payments(&mut conn, sub)?,
        Some(("expense", sub)) => commands::expenses::handle(&mut conn, sub)?,
        Some(("advance", sub)) => commands::advances::handle(&mut conn, sub)?,
        Some(("dashboard", sub)) => commands::dashboard::handle(&conn, sub)?,
        Some(("balances", sub)) => commands::reports::handle(&conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("import", sub)) => commands::importer::handle(&mut conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
