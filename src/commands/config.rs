// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::utils::{DEFAULT_CURRENCY, DEFAULT_EPSILON, get_setting, parse_decimal, set_setting};

const KNOWN_KEYS: &[(&str, &str)] = &[
    ("currency", DEFAULT_CURRENCY),
    ("consistency_epsilon", DEFAULT_EPSILON),
];

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            println!("{}", get(conn, key)?);
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let value = sub.get_one::<String>("value").unwrap();
            set(conn, key, value)?;
            println!("{} = {}", key, get(conn, key)?);
        }
        _ => {}
    }
    Ok(())
}

fn default_for(key: &str) -> Result<&'static str> {
    match KNOWN_KEYS.iter().find(|(k, _)| *k == key) {
        Some((_, default)) => Ok(default),
        None => bail!("Unknown setting '{}'", key),
    }
}

/// Stored value, or the default when unset.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    let default = default_for(key)?;
    Ok(get_setting(conn, key)?.unwrap_or_else(|| default.to_string()))
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    default_for(key)?;
    let value = value.trim();
    match key {
        "currency" => {
            if value.is_empty() {
                bail!("currency cannot be empty");
            }
            set_setting(conn, key, &value.to_uppercase())
        }
        "consistency_epsilon" => {
            let eps = parse_decimal(value)?;
            if eps.is_sign_negative() {
                bail!("consistency_epsilon must be non-negative");
            }
            set_setting(conn, key, &eps.to_string())
        }
        _ => set_setting(conn, key, value),
    }
}
