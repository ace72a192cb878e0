// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_parser(value_parser!(i64))
        .required(true)
}

fn opt_id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_parser(value_parser!(i64))
}

fn text_arg(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(long).help(help)
}

fn date_arg() -> Arg {
    Arg::new("date")
        .long("date")
        .help("YYYY-MM-DD")
        .required(true)
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

fn pending_flag() -> Arg {
    Arg::new("pending")
        .long("pending")
        .action(ArgAction::SetTrue)
        .help("Record as Pending; totals move only when completed")
}

fn by_id(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .arg(id_arg("id", "Record id"))
}

fn owner_cmd() -> Command {
    Command::new("owner")
        .about("Machine owners")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(text_arg("name", "name", "Owner name").required(true))
                .arg(text_arg("phone", "phone", "Contact number"))
                .arg(text_arg("rate", "rate", "Nominal owner rate per hour")),
        )
        .subcommand(json_flags(Command::new("list")))
}

fn machine_cmd() -> Command {
    Command::new("machine")
        .about("Harvesting machines")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(id_arg("owner", "Owning owner id"))
                .arg(text_arg("name", "name", "Machine name").required(true))
                .arg(text_arg("type", "type", "Machine type"))
                .arg(text_arg("rate", "rate", "Rate per hour charged to farmers"))
                .arg(text_arg(
                    "owner_rate",
                    "owner-rate",
                    "Rate per hour owed to the owner (defaults to the owner's rate)",
                )),
        )
        .subcommand(
            Command::new("set-rate")
                .about("Change rates for future bookings")
                .arg(id_arg("id", "Machine id"))
                .arg(text_arg("rate", "rate", "Rate per hour charged to farmers"))
                .arg(text_arg("owner_rate", "owner-rate", "Rate per hour owed to the owner")),
        )
        .subcommand(json_flags(Command::new("list")))
}

fn party_cmd(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(text_arg("name", "name", "Name").required(true))
                .arg(text_arg("village", "village", "Village"))
                .arg(text_arg("phone", "phone", "Contact number")),
        )
        .subcommand(json_flags(Command::new("list")))
}

fn job_amount_args(cmd: Command) -> Command {
    cmd.arg(text_arg("rate", "rate", "Farmer rate per hour (defaults to the machine's)"))
        .arg(text_arg("total", "total", "Gross charge overriding hours x rate"))
        .arg(text_arg("advance", "advance", "Advance paid by the farmer"))
        .arg(text_arg("farmer_discount", "farmer-discount", "Discount given to the farmer"))
        .arg(text_arg("owner_discount", "owner-discount", "Discount given by the owner"))
        .arg(text_arg("note", "note", "Free text"))
}

fn job_cmd() -> Command {
    Command::new("job")
        .about("Harvesting jobs")
        .subcommand_required(true)
        .subcommand(job_amount_args(
            Command::new("add")
                .arg(id_arg("farmer", "Farmer id"))
                .arg(id_arg("machine", "Machine id"))
                .arg(date_arg())
                .arg(text_arg("hours", "hours", "Hours worked").required(true)),
        ))
        .subcommand(job_amount_args(
            Command::new("update")
                .arg(id_arg("id", "Job id"))
                .arg(opt_id_arg("farmer", "Farmer id"))
                .arg(opt_id_arg("machine", "Machine id"))
                .arg(text_arg("date", "date", "YYYY-MM-DD"))
                .arg(text_arg("hours", "hours", "Hours worked")),
        ))
        .subcommand(by_id("rm", "Delete a job and reverse its balances"))
        .subcommand(json_flags(
            Command::new("list")
                .arg(opt_id_arg("machine", "Only this machine"))
                .arg(text_arg("village", "village", "Only farmers from this village")),
        ))
}

fn pay_cmd() -> Command {
    Command::new("pay")
        .about("Payments to owners and from farmers")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_parser(["owner", "farmer"])
                        .default_value("farmer")
                        .help("owner: paid to a machine owner; farmer: received from a farmer"),
                )
                .arg(
                    Arg::new("source")
                        .long("source")
                        .value_parser(["harvesting", "rental"])
                        .help("Business the payment belongs to (default harvesting)"),
                )
                .arg(opt_id_arg("owner", "Owner id"))
                .arg(opt_id_arg("farmer", "Farmer id"))
                .arg(opt_id_arg("job", "Job the payment settles"))
                .arg(date_arg())
                .arg(text_arg("amount", "amount", "Gross amount").required(true))
                .arg(text_arg("discount", "discount", "Discount taken off the gross"))
                .arg(pending_flag())
                .arg(text_arg("note", "note", "Free text")),
        )
        .subcommand(by_id("rm", "Delete a payment and reverse it"))
        .subcommand(by_id("complete", "Mark a pending payment completed"))
        .subcommand(json_flags(Command::new("list")))
}

fn rental_cmd() -> Command {
    Command::new("rental")
        .about("Machine rentals to dealers")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(id_arg("dealer", "Dealer id"))
                .arg(id_arg("machine", "Machine id"))
                .arg(date_arg())
                .arg(text_arg("hours", "hours", "Hours used so far"))
                .arg(text_arg("rate", "rate", "Hourly rate to the dealer"))
                .arg(text_arg("owner_cost", "owner-cost", "Hourly cost owed to the owner"))
                .arg(text_arg("advance", "advance", "Advance paid by the dealer")),
        )
        .subcommand(
            Command::new("update")
                .arg(id_arg("id", "Rental id"))
                .arg(text_arg("hours", "hours", "Hours used"))
                .arg(text_arg("rate", "rate", "Hourly rate to the dealer"))
                .arg(text_arg("owner_cost", "owner-cost", "Hourly cost owed to the owner"))
                .arg(text_arg("advance", "advance", "Advance paid by the dealer")),
        )
        .subcommand(
            Command::new("complete")
                .arg(id_arg("id", "Rental id"))
                .arg(date_arg())
                .arg(text_arg("hours", "hours", "Final hours used")),
        )
        .subcommand(by_id("rm", "Delete a rental without payments"))
        .subcommand(json_flags(
            Command::new("list")
                .arg(opt_id_arg("machine", "Only this machine"))
                .arg(text_arg("village", "village", "Only dealers from this village")),
        ))
}

fn rental_pay_cmd() -> Command {
    Command::new("rental-pay")
        .about("Payments from dealers against rentals")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(id_arg("rental", "Rental id"))
                .arg(date_arg())
                .arg(text_arg("amount", "amount", "Amount received").required(true))
                .arg(pending_flag())
                .arg(text_arg("note", "note", "Free text")),
        )
        .subcommand(by_id("rm", "Delete a rental payment and reverse it"))
        .subcommand(by_id("complete", "Mark a pending rental payment completed"))
        .subcommand(json_flags(Command::new("list")))
}

fn expense_cmd() -> Command {
    Command::new("expense")
        .about("Daily expenses paid on behalf of an owner")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(id_arg("machine", "Machine id"))
                .arg(date_arg())
                .arg(text_arg("amount", "amount", "Amount spent").required(true))
                .arg(text_arg("description", "description", "What it was for")),
        )
        .subcommand(by_id("rm", "Delete an expense"))
        .subcommand(json_flags(Command::new("list")))
}

fn advance_cmd() -> Command {
    Command::new("advance")
        .about("Advances given to owners")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(id_arg("owner", "Owner id"))
                .arg(opt_id_arg("machine", "Machine id"))
                .arg(date_arg())
                .arg(text_arg("amount", "amount", "Amount advanced").required(true))
                .arg(text_arg("note", "note", "Free text")),
        )
        .subcommand(by_id("rm", "Delete an advance"))
        .subcommand(json_flags(Command::new("list")))
}

fn export_target(name: &'static str) -> Command {
    Command::new(name)
        .arg(
            Arg::new("format")
                .long("format")
                .default_value("csv")
                .help("csv|json"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .required(true)
                .help("Output path"),
        )
}

pub fn build_cli() -> Command {
    Command::new("harvestledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ledger for a harvesting machine business")
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("config")
                .about("Runtime settings")
                .subcommand_required(true)
                .subcommand(
                    Command::new("get").arg(text_arg("key", "key", "Setting name").required(true)),
                )
                .subcommand(
                    Command::new("set")
                        .arg(text_arg("key", "key", "Setting name").required(true))
                        .arg(text_arg("value", "value", "New value").required(true)),
                ),
        )
        .subcommand(owner_cmd())
        .subcommand(machine_cmd())
        .subcommand(party_cmd("farmer", "Farmers"))
        .subcommand(party_cmd("dealer", "Dealers"))
        .subcommand(job_cmd())
        .subcommand(pay_cmd())
        .subcommand(rental_cmd())
        .subcommand(rental_pay_cmd())
        .subcommand(expense_cmd())
        .subcommand(advance_cmd())
        .subcommand(
            Command::new("dashboard")
                .about("Harvesting, rental and combined totals")
                .arg(opt_id_arg("machine", "Only this machine"))
                .arg(text_arg("village", "village", "Only this village"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print as JSON"),
                ),
        )
        .subcommand(
            Command::new("balances")
                .about("Recomputed balances per party")
                .subcommand_required(true)
                .subcommand(json_flags(Command::new("owners")))
                .subcommand(json_flags(Command::new("farmers")))
                .subcommand(json_flags(Command::new("dealers"))),
        )
        .subcommand(Command::new("doctor").about("Compare stored totals with recomputation"))
        .subcommand(
            Command::new("export")
                .subcommand_required(true)
                .subcommand(export_target("jobs"))
                .subcommand(export_target("payments")),
        )
        .subcommand(
            Command::new("import").subcommand_required(true).subcommand(
                Command::new("jobs").arg(
                    Arg::new("path")
                        .long("path")
                        .required(true)
                        .help("CSV with a header row"),
                ),
            ),
        )
}
