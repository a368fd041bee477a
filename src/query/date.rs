//! Date literal resolution
//!
//! Turns the date literals accepted by the filter language into ISO-8601
//! strings with millisecond precision and a numeric offset:
//!
//! ```text
//! now            current instant
//! today          midnight of the current day in the requested zone
//! now-15m        relative offsets in s, m, h, d, w, M (months), y (years)
//! today+1d
//! 2024-03-13 12:00:00.432   wall-clock time in the requested zone
//! ```
//!
//! The zone is `Z` or a fixed `±HH:MM` offset.

use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDateTime, Offset, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::query::error::{QueryError, QueryResult};

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";
const ABSOLUTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(now|today)(?:([+-])(\d+)([smhdwMy]))?$").expect("relative date pattern")
    })
}

fn absolute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}$").expect("absolute date pattern")
    })
}

fn zone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([+-])(2[0-3]|[01][0-9]):([0-5][0-9])$").expect("time zone pattern")
    })
}

/// Resolves date literals for one time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResolver {
    offset: FixedOffset,
}

impl DateResolver {
    /// Create a resolver for `Z` or `±HH:MM`
    pub fn new(time_zone: &str) -> QueryResult<Self> {
        Ok(Self {
            offset: parse_time_zone(time_zone)?,
        })
    }

    /// Resolver for UTC
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Resolve a literal against the current time
    pub fn resolve(&self, literal: &str) -> QueryResult<String> {
        self.resolve_at(literal, Utc::now())
    }

    /// Resolve a literal with `now` pinned to the given instant
    pub fn resolve_at(&self, literal: &str, now: DateTime<Utc>) -> QueryResult<String> {
        let resolved = match relative_pattern().captures(literal) {
            Some(caps) => {
                let base = now.with_timezone(&self.offset);
                let base = if &caps[1] == "today" {
                    self.start_of_day(base)?
                } else {
                    base
                };

                match (caps.get(2), caps.get(3), caps.get(4)) {
                    (Some(sign), Some(amount), Some(unit)) => {
                        let amount: i64 = amount
                            .as_str()
                            .parse()
                            .map_err(|_| QueryError::InvalidDateFormat)?;
                        let amount = if sign.as_str() == "-" { -amount } else { amount };
                        shift(base, amount, unit.as_str())?
                    }
                    _ => base,
                }
            }
            None => self.parse_absolute(literal)?,
        };

        Ok(resolved.format(OUTPUT_FORMAT).to_string())
    }

    fn start_of_day(&self, at: DateTime<FixedOffset>) -> QueryResult<DateTime<FixedOffset>> {
        at.date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.offset.from_local_datetime(&midnight).single())
            .ok_or(QueryError::InvalidDateFormat)
    }

    fn parse_absolute(&self, literal: &str) -> QueryResult<DateTime<FixedOffset>> {
        if !absolute_pattern().is_match(literal) {
            return Err(QueryError::InvalidDateFormat);
        }

        let naive = NaiveDateTime::parse_from_str(literal, ABSOLUTE_FORMAT)
            .map_err(|_| QueryError::InvalidDateFormat)?;

        self.offset
            .from_local_datetime(&naive)
            .single()
            .ok_or(QueryError::InvalidDateFormat)
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::utc()
    }
}

/// Resolve a single literal in the given zone
pub fn resolve_date(literal: &str, time_zone: &str) -> QueryResult<String> {
    DateResolver::new(time_zone)?.resolve(literal)
}

/// Parse `Z` or `±HH:MM`
pub fn parse_time_zone(time_zone: &str) -> QueryResult<FixedOffset> {
    if time_zone == "Z" {
        return Ok(Utc.fix());
    }

    let caps = zone_pattern()
        .captures(time_zone)
        .ok_or(QueryError::InvalidTimezoneFormat)?;

    let hours: i32 = caps[2].parse().map_err(|_| QueryError::InvalidTimezoneFormat)?;
    let minutes: i32 = caps[3].parse().map_err(|_| QueryError::InvalidTimezoneFormat)?;
    let seconds = hours * 3600 + minutes * 60;
    let seconds = if &caps[1] == "-" { -seconds } else { seconds };

    FixedOffset::east_opt(seconds).ok_or(QueryError::InvalidTimezoneFormat)
}

/// Shift by a signed amount of the given unit
fn shift(
    base: DateTime<FixedOffset>,
    amount: i64,
    unit: &str,
) -> QueryResult<DateTime<FixedOffset>> {
    let seconds_per_unit = match unit {
        "s" => Some(1),
        "m" => Some(60),
        "h" => Some(3600),
        "d" => Some(86_400),
        "w" => Some(7 * 86_400),
        _ => None,
    };

    let shifted = match seconds_per_unit {
        Some(per_unit) => amount
            .checked_mul(per_unit)
            .and_then(Duration::try_seconds)
            .and_then(|delta| base.checked_add_signed(delta)),
        None => {
            let months = match unit {
                "y" => amount.checked_mul(12),
                _ => Some(amount),
            };
            months.and_then(|m| {
                let magnitude = Months::new(u32::try_from(m.unsigned_abs()).ok()?);
                if m < 0 {
                    base.checked_sub_months(magnitude)
                } else {
                    base.checked_add_months(magnitude)
                }
            })
        }
    };

    shifted.ok_or(QueryError::InvalidDateFormat)
}
