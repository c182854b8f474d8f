//! Prints the upcoming dates of an encoded interval.
//!
//! Usage: cargo run --bin next-dates -- "weekly|2|2024-01-01;2024-01-03"
//!        cargo run --bin next-dates -- "monthly|1|2024-01-31" --after 2024-02-15 --count 3
//!        cargo run --bin next-dates -- "daily|1|2024-01-01" --timezone Europe/Berlin

mod config;
mod directory;
mod i18n;
mod interval;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use dotenvy::EnvLoader;

use crate::interval::{format_iso_date, parse_iso_date, Interval};

#[derive(Parser, Debug)]
#[command(name = "next-dates")]
#[command(about = "Print the upcoming dates of an encoded interval")]
struct Args {
    /// Encoded interval, e.g. "weekly|1|2024-01-01"
    interval: String,

    /// List dates after this day (default: today)
    #[arg(long)]
    after: Option<String>,

    /// Number of dates to print
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Timezone that decides "today" (overrides TAMM_TIMEZONE from .env)
    #[arg(long)]
    timezone: Option<String>,
}

fn upcoming_lines(interval: &Interval, after: NaiveDate, count: usize) -> Vec<String> {
    interval
        .upcoming(after, count)
        .into_iter()
        .map(|date| format!("{} {}", format_iso_date(date), date.format("%a")))
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    let dotenv = EnvLoader::new().load().unwrap_or_default();
    let timezone = args
        .timezone
        .or_else(|| dotenv.get("TAMM_TIMEZONE").cloned())
        .or_else(|| std::env::var("TAMM_TIMEZONE").ok())
        .unwrap_or_else(|| "UTC".to_string());
    config::init_timezone(&timezone);

    let interval = Interval::parse(&args.interval)
        .with_context(|| format!("invalid interval '{}'", args.interval))?;
    let after = match args.after {
        Some(text) => parse_iso_date(&text).with_context(|| format!("invalid date '{text}'"))?,
        None => config::today(),
    };

    let lines = upcoming_lines(&interval, after, args.count);
    if lines.is_empty() {
        println!("No dates after {}", format_iso_date(after));
    }
    for line in lines {
        println!("{line}");
    }

    Ok(())
}
