use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use thiserror::Error;
use tracing::debug;

/// Format of every date that crosses the backend boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Upper bound on how far monthly and yearly anchors are stepped forward.
const MAX_STEPS: i32 = 100;

/// Kind of recurrence, as chosen by the `interval` radio group.
///
/// Unknown labels are kept in `Other` so that they survive a decode/encode
/// round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repeat {
    Single,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Other(String),
}

impl Repeat {
    /// The kinds offered in the task form, in display order.
    pub fn known() -> [Repeat; 5] {
        [
            Repeat::Single,
            Repeat::Daily,
            Repeat::Weekly,
            Repeat::Monthly,
            Repeat::Yearly,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            Repeat::Single => "single",
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
            Repeat::Monthly => "monthly",
            Repeat::Yearly => "yearly",
            Repeat::Other(label) => label,
        }
    }

    pub fn from_label(label: &str) -> Repeat {
        match label {
            "single" => Repeat::Single,
            "daily" => Repeat::Daily,
            "weekly" => Repeat::Weekly,
            "monthly" => Repeat::Monthly,
            "yearly" => Repeat::Yearly,
            other => Repeat::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Repeat::Other(_))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("expected 3 '|' separated segments, found {0}")]
    SegmentCount(usize),
    #[error("unknown interval kind '{0}'")]
    UnknownKind(String),
    #[error("divisor '{0}' is not a positive number")]
    InvalidDivisor(String),
    #[error("start date '{0}' is not an ISO date")]
    InvalidDate(String),
}

/// A recurrence rule: kind, divisor and the ordered list of start dates.
///
/// The divisor and dates are kept as the text the user entered. Encoding
/// reproduces them verbatim; only [`Interval::parse`] and the date
/// calculations look at their meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub repeat: Repeat,
    pub divisor: String,
    pub start_dates: Vec<String>,
}

impl Default for Interval {
    fn default() -> Self {
        Self {
            repeat: Repeat::Single,
            divisor: "1".to_string(),
            start_dates: vec![String::new()],
        }
    }
}

impl Interval {
    /// Decode the stored `kind|divisor|date;date` form.
    ///
    /// Anything that does not split into exactly three segments, including
    /// a missing or empty value, yields [`Interval::default`]. The reason is
    /// only logged; use [`Interval::parse`] to get it as an error.
    pub fn decode(encoded: Option<&str>) -> Interval {
        let Some(encoded) = encoded.filter(|e| !e.is_empty()) else {
            return Interval::default();
        };

        let parts: Vec<&str> = encoded.split('|').collect();
        if parts.len() != 3 {
            debug!(encoded, "invalid interval ignored");
            return Interval::default();
        }

        Interval {
            repeat: Repeat::from_label(parts[0]),
            divisor: parts[1].to_string(),
            start_dates: parts[2].split(';').map(str::to_string).collect(),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}",
            self.repeat.label(),
            self.divisor,
            self.start_dates.join(";")
        )
    }

    /// Strict decode: the string must be a complete, computable interval.
    pub fn parse(encoded: &str) -> Result<Interval, IntervalError> {
        let parts: Vec<&str> = encoded.split('|').collect();
        if parts.len() != 3 {
            return Err(IntervalError::SegmentCount(parts.len()));
        }

        let interval = Interval::decode(Some(encoded));
        interval.checked()?;
        Ok(interval)
    }

    pub fn is_valid(&self) -> bool {
        self.checked().is_ok()
    }

    /// Divisor as a number, if it is a positive integer.
    pub fn divisor_value(&self) -> Option<u32> {
        self.divisor.trim().parse::<u32>().ok().filter(|d| *d > 0)
    }

    fn checked(&self) -> Result<(i64, Vec<NaiveDate>), IntervalError> {
        if let Repeat::Other(label) = &self.repeat {
            return Err(IntervalError::UnknownKind(label.clone()));
        }

        let divisor = self
            .divisor_value()
            .ok_or_else(|| IntervalError::InvalidDivisor(self.divisor.clone()))?;

        let dates = self
            .start_dates
            .iter()
            .map(|d| parse_iso_date(d).ok_or_else(|| IntervalError::InvalidDate(d.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        if dates.is_empty() {
            return Err(IntervalError::InvalidDate(String::new()));
        }

        Ok((i64::from(divisor), dates))
    }

    /// The first occurrence strictly after `after`, or `None` when the
    /// interval is not valid or has no further occurrence.
    pub fn next_date(&self, after: NaiveDate) -> Option<NaiveDate> {
        let (divisor, dates) = self.checked().ok()?;

        match self.repeat {
            Repeat::Single => dates.into_iter().find(|d| *d > after),
            Repeat::Daily => next_daily(after, divisor, &dates),
            Repeat::Weekly => next_daily(after, 7 * divisor, &dates),
            Repeat::Monthly => next_by_months(after, divisor, &dates),
            Repeat::Yearly => next_by_months(after, 12 * divisor, &dates),
            Repeat::Other(_) => None,
        }
    }

    /// Up to `count` consecutive occurrences after `after`.
    pub fn upcoming(&self, after: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(count);
        let mut current = after;
        while dates.len() < count {
            match self.next_date(current) {
                Some(next) => {
                    dates.push(next);
                    current = next;
                }
                None => break,
            }
        }
        dates
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Parse a `YYYY-MM-DD` date. Shorter forms like `2024-1-2` are rejected.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// With a single anchor the next date is simply one step later. With several
// anchors, each one defines a residue class modulo the step and the earliest
// day after `after` in any class wins.
fn next_daily(after: NaiveDate, step: i64, anchors: &[NaiveDate]) -> Option<NaiveDate> {
    if anchors.len() == 1 {
        return after.checked_add_signed(Duration::days(step));
    }

    let day_after = i64::from(after.num_days_from_ce()) + 1;
    let after_residue = day_after.rem_euclid(step);

    let next_day = anchors
        .iter()
        .map(|anchor| {
            let residue = i64::from(anchor.num_days_from_ce()).rem_euclid(step);
            let mut candidate = day_after + residue - after_residue;
            if candidate < day_after {
                candidate += step;
            }
            candidate
        })
        .min()?;

    i32::try_from(next_day)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

// Steps every anchor forward by `months` until it passes `after`. The day of
// month is taken from the anchor and clamped to the length of the target
// month, so the 31st becomes the 30th in April without drifting afterwards.
fn next_by_months(after: NaiveDate, months: i64, anchors: &[NaiveDate]) -> Option<NaiveDate> {
    anchors
        .iter()
        .filter_map(|anchor| {
            let base = i64::from(anchor.year()) * 12 + i64::from(anchor.month0());
            (0..MAX_STEPS)
                .filter_map(|step| {
                    let index = base + i64::from(step) * months;
                    let year = i32::try_from(index.div_euclid(12)).ok()?;
                    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
                    clamped_date(year, month, anchor.day())
                })
                .find(|candidate| *candidate > after)
        })
        .min()
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (1..=day)
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
}
