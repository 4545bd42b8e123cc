//! Command line entry point: read a record file and print reports.

use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, Duration, Local, NaiveDate};
use clap::Parser;
use colored::Colorize;
use tracing::info;

use markbook::ledger::period::{self, Period};
use markbook::parse::{read_ledger, ReadOptions};
use markbook::report::{self, Entry, Metric};

#[derive(Parser, Debug)]
#[command(name = "markbook", about = "account analysis from record files")]
struct Args {
    /// Records file to load.
    file: PathBuf,

    /// Report date as YYYYMMDD (default: last completed quarter end).
    #[arg(long, value_parser = parse_report_date)]
    date: Option<NaiveDate>,

    /// Carry balances forward up to N days from previous marks when a
    /// period boundary has no mark.
    #[arg(long, value_name = "DAYS", default_value_t = 0)]
    carry_forward: i64,

    /// Carry each open account's last balance to the report date.
    #[arg(long)]
    carry_last: bool,

    /// Fail on records for accounts that were never opened.
    #[arg(long)]
    strict: bool,

    /// Dump one account's ledger as CSV instead of reporting.
    #[arg(long, value_name = "ACCOUNT")]
    csv: Option<String>,

    /// Emit performance rows as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

fn parse_report_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
}

fn main() -> ExitCode {
    markbook::init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error}", "error:".red());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let date = args
        .date
        .unwrap_or_else(|| period::end_of_completed_quarter(Local::now().date_naive()));
    info!(%date, file = %args.file.display(), "reading records");

    let input = fs::read_to_string(&args.file)?;
    let options = ReadOptions {
        strict: args.strict,
        carry_last: args.carry_last,
        to_date: Some(date),
    };
    let mut data = read_ledger(&input, &options)?;

    if args.carry_forward > 0 {
        let window = Duration::days(args.carry_forward);
        for account in data.accounts.values_mut() {
            account.set_carry_window(Some(window));
        }
        for meta in data.metas.values_mut() {
            meta.set_carry_window(Some(window));
        }
    }

    if let Some(name) = &args.csv {
        let account = data
            .accounts
            .get(name)
            .or_else(|| data.metas.get(name).map(|m| m.account()))
            .ok_or_else(|| format!("no such account: {name}"))?;
        account.write_csv(io::stdout())?;
        return Ok(());
    }

    let entries: Vec<Entry<'_>> = data
        .accounts
        .values()
        .map(Entry::account)
        .chain(data.metas.values().map(Entry::meta))
        .collect();
    let periods = period::standard_periods(date).unwrap_or_else(|| {
        vec![
            period::period_of_preceding_quarter(date),
            Period::new(None, date, "Lifetime"),
        ]
    });

    if args.json {
        serde_json::to_writer_pretty(io::stdout(), &report::performance_rows(&entries, &periods))?;
        println!();
        return Ok(());
    }

    let dates: Vec<NaiveDate> = (0..3)
        .filter_map(|years| {
            NaiveDate::from_ymd_opt(date.year() - years, date.month(), date.day())
        })
        .collect();

    println!("{}", report::net_worth(&entries, &dates).render(true));
    println!("{}", report::overview(&entries, &periods).render(true));
    println!(
        "{}",
        report::stats(&entries, &periods, Metric::Gain).render(true)
    );
    println!(
        "{}",
        report::stats(&entries, &periods, Metric::NetAdditions).render(true)
    );
    for entry in &entries {
        println!("{}", report::detail(entry, &periods).render(true));
    }
    Ok(())
}
