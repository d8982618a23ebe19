// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CIM date-time values.
//!
//! A date-time is stored as a compact record (microseconds, UTC offset,
//! sign, wildcard count) and rendered in the fixed 25-character form:
//!
//! ```text
//! timestamp: yyyymmddhhmmss.mmmmmm[+-]uuu
//! interval:  ddddddddhhmmss.mmmmmm:000
//! ```
//!
//! Timestamps count microseconds from 0000-01-01T00:00:00 in the proleptic
//! Gregorian calendar; intervals count elapsed microseconds.

use super::ModelError;
use std::fmt;
use std::str::FromStr;

const USEC_PER_SEC: u64 = 1_000_000;
const USEC_PER_MIN: u64 = 60 * USEC_PER_SEC;
const USEC_PER_HOUR: u64 = 60 * USEC_PER_MIN;
const USEC_PER_DAY: u64 = 24 * USEC_PER_HOUR;

/// Days between 0000-01-01 and 1970-01-01.
const DAYS_YEAR0_TO_EPOCH: i64 = 719_528;

const MAX_INTERVAL_DAYS: u64 = 99_999_999;
const MAX_YEAR: i64 = 9999;
const MAX_UTC_OFFSET: u32 = 999;

/// Number of significant digits (the 25-character form minus '.' and the offset).
const SIGNIFICANT_DIGITS: u16 = 20;

/// Length of the string form.
pub const DATETIME_STRING_LEN: usize = 25;

/// Sign character of the 25-character form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateTimeSign {
    #[default]
    Plus,
    Minus,
    Interval,
}

impl DateTimeSign {
    pub const fn as_char(self) -> char {
        match self {
            DateTimeSign::Plus => '+',
            DateTimeSign::Minus => '-',
            DateTimeSign::Interval => ':',
        }
    }

    /// Wire code: the ASCII value of the sign character.
    pub const fn code(self) -> u16 {
        self.as_char() as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x2B => Some(DateTimeSign::Plus),
            0x2D => Some(DateTimeSign::Minus),
            0x3A => Some(DateTimeSign::Interval),
            _ => None,
        }
    }
}

/// A CIM datetime record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CimDateTime {
    microseconds: u64,
    utc_offset: u32,
    sign: DateTimeSign,
    wildcards: u16,
}

impl CimDateTime {
    /// Build a record from its raw parts, validating ranges.
    pub fn from_parts(
        microseconds: u64,
        utc_offset: u32,
        sign: DateTimeSign,
        wildcards: u16,
    ) -> Result<Self, ModelError> {
        if wildcards > SIGNIFICANT_DIGITS {
            return Err(ModelError::InvalidDateTime(format!(
                "{} wildcards exceed {} digits",
                wildcards, SIGNIFICANT_DIGITS
            )));
        }
        if utc_offset > MAX_UTC_OFFSET {
            return Err(ModelError::InvalidDateTime(format!(
                "utc offset {} out of range",
                utc_offset
            )));
        }
        if sign == DateTimeSign::Interval {
            if utc_offset != 0 {
                return Err(ModelError::InvalidDateTime(
                    "interval carries a utc offset".into(),
                ));
            }
            if microseconds / USEC_PER_DAY > MAX_INTERVAL_DAYS {
                return Err(ModelError::InvalidDateTime("interval too large".into()));
            }
        } else {
            let days = (microseconds / USEC_PER_DAY) as i64;
            let (year, _, _) = civil_from_days(days - DAYS_YEAR0_TO_EPOCH);
            if year > MAX_YEAR {
                return Err(ModelError::InvalidDateTime("year beyond 9999".into()));
            }
        }
        Ok(Self {
            microseconds,
            utc_offset,
            sign,
            wildcards,
        })
    }

    /// Timestamp from calendar fields; `utc_offset_minutes` is signed.
    #[allow(clippy::too_many_arguments)]
    pub fn timestamp(
        year: u32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        microsecond: u32,
        utc_offset_minutes: i32,
    ) -> Result<Self, ModelError> {
        if i64::from(year) > MAX_YEAR
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(i64::from(year), month)
            || hour > 23
            || minute > 59
            || second > 59
            || u64::from(microsecond) >= USEC_PER_SEC
        {
            return Err(ModelError::InvalidDateTime(format!(
                "invalid timestamp {:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                year, month, day, hour, minute, second, microsecond
            )));
        }
        let days = days_from_civil(i64::from(year), month, day) + DAYS_YEAR0_TO_EPOCH;
        let microseconds = days as u64 * USEC_PER_DAY
            + u64::from(hour) * USEC_PER_HOUR
            + u64::from(minute) * USEC_PER_MIN
            + u64::from(second) * USEC_PER_SEC
            + u64::from(microsecond);
        let sign = if utc_offset_minutes < 0 {
            DateTimeSign::Minus
        } else {
            DateTimeSign::Plus
        };
        Self::from_parts(microseconds, utc_offset_minutes.unsigned_abs(), sign, 0)
    }

    /// Interval from elapsed fields.
    pub fn interval(
        days: u64,
        hours: u32,
        minutes: u32,
        seconds: u32,
        microseconds: u32,
    ) -> Result<Self, ModelError> {
        if days > MAX_INTERVAL_DAYS
            || hours > 23
            || minutes > 59
            || seconds > 59
            || u64::from(microseconds) >= USEC_PER_SEC
        {
            return Err(ModelError::InvalidDateTime("invalid interval".into()));
        }
        let total = days * USEC_PER_DAY
            + u64::from(hours) * USEC_PER_HOUR
            + u64::from(minutes) * USEC_PER_MIN
            + u64::from(seconds) * USEC_PER_SEC
            + u64::from(microseconds);
        Self::from_parts(total, 0, DateTimeSign::Interval, 0)
    }

    pub fn microseconds(&self) -> u64 {
        self.microseconds
    }

    /// Magnitude of the UTC offset in minutes.
    pub fn utc_offset(&self) -> u32 {
        self.utc_offset
    }

    /// Signed UTC offset in minutes (0 for intervals).
    pub fn utc_offset_minutes(&self) -> i32 {
        match self.sign {
            DateTimeSign::Minus => -(self.utc_offset as i32),
            _ => self.utc_offset as i32,
        }
    }

    pub fn sign(&self) -> DateTimeSign {
        self.sign
    }

    pub fn wildcards(&self) -> u16 {
        self.wildcards
    }

    pub fn is_interval(&self) -> bool {
        self.sign == DateTimeSign::Interval
    }

    /// Same instant with `count` trailing digits rendered as `*`.
    pub fn with_wildcards(self, count: u16) -> Result<Self, ModelError> {
        Self::from_parts(self.microseconds, self.utc_offset, self.sign, count)
    }

    fn digits(&self) -> String {
        let usec = self.microseconds % USEC_PER_SEC;
        let secs = (self.microseconds / USEC_PER_SEC) % 60;
        let mins = (self.microseconds / USEC_PER_MIN) % 60;
        let hours = (self.microseconds / USEC_PER_HOUR) % 24;
        let days = self.microseconds / USEC_PER_DAY;
        if self.is_interval() {
            format!(
                "{:08}{:02}{:02}{:02}.{:06}",
                days, hours, mins, secs, usec
            )
        } else {
            let (year, month, day) = civil_from_days(days as i64 - DAYS_YEAR0_TO_EPOCH);
            format!(
                "{:04}{:02}{:02}{:02}{:02}{:02}.{:06}",
                year, month, day, hours, mins, secs, usec
            )
        }
    }
}

impl fmt::Display for CimDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars: Vec<char> = self.digits().chars().collect();
        let mut remaining = self.wildcards;
        for c in chars.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if *c != '.' {
                *c = '*';
                remaining -= 1;
            }
        }
        let body: String = chars.into_iter().collect();
        write!(f, "{}{}{:03}", body, self.sign.as_char(), self.utc_offset)
    }
}

impl FromStr for CimDateTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidDateTime(s.to_string());
        if s.len() != DATETIME_STRING_LEN || !s.is_ascii() {
            return Err(invalid());
        }
        let bytes = s.as_bytes();
        if bytes[14] != b'.' {
            return Err(invalid());
        }
        let sign = DateTimeSign::from_code(u16::from(bytes[21])).ok_or_else(invalid)?;

        // Wildcards must form a contiguous tail of the significant digits.
        let significant: Vec<u8> = bytes[..21].iter().copied().filter(|b| *b != b'.').collect();
        let wildcards = significant.iter().rev().take_while(|b| **b == b'*').count();
        if significant[..significant.len() - wildcards]
            .iter()
            .any(|b| !b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| -> Result<u64, ModelError> {
            let mut value = 0u64;
            for b in &bytes[range] {
                let digit = if *b == b'*' { 0 } else { u64::from(b - b'0') };
                value = value * 10 + digit;
            }
            Ok(value)
        };

        let offset_text = &s[22..25];
        let utc_offset = if offset_text.bytes().all(|b| b == b'*') {
            0
        } else {
            offset_text.parse::<u32>().map_err(|_| invalid())?
        };

        let hours = field(8..10)?;
        let minutes = field(10..12)?;
        let seconds = field(12..14)?;
        let usec = field(15..21)?;
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(invalid());
        }
        let time = hours * USEC_PER_HOUR + minutes * USEC_PER_MIN + seconds * USEC_PER_SEC + usec;

        let microseconds = if sign == DateTimeSign::Interval {
            if utc_offset != 0 {
                return Err(invalid());
            }
            field(0..8)? * USEC_PER_DAY + time
        } else {
            let year = field(0..4)? as i64;
            let month = (field(4..6)? as u32).max(1);
            let day = (field(6..8)? as u32).max(1);
            if month > 12 || day > days_in_month(year, month) {
                return Err(invalid());
            }
            let days = days_from_civil(year, month, day) + DAYS_YEAR0_TO_EPOCH;
            days as u64 * USEC_PER_DAY + time
        };

        Self::from_parts(microseconds, utc_offset, sign, wildcards as u16)
    }
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = (y - era * 400) as u64;
    let mp = u64::from(if month > 2 { month - 3 } else { month + 9 });
    let doy = (153 * mp + 2) / 5 + u64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i64 - 719_468
}

/// Proleptic Gregorian date for a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    (if month <= 2 { y + 1 } else { y }, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_formats_25_chars() {
        let dt = CimDateTime::timestamp(2024, 2, 29, 13, 5, 59, 123_456, -300).unwrap();
        let text = dt.to_string();
        assert_eq!(text, "20240229130559.123456-300");
        assert_eq!(text.len(), DATETIME_STRING_LEN);
        assert_eq!(dt.utc_offset_minutes(), -300);
    }

    #[test]
    fn test_interval_formats() {
        let dt = CimDateTime::interval(12, 3, 4, 5, 6).unwrap();
        assert_eq!(dt.to_string(), "00000012030405.000006:000");
        assert!(dt.is_interval());
    }

    #[test]
    fn test_parse_roundtrip() {
        for text in [
            "19700101000000.000000+000",
            "00000101000000.000000+000",
            "99991231235959.999999-720",
            "20000229120000.500000+060",
            "99999999235959.999999:000",
        ] {
            let dt: CimDateTime = text.parse().unwrap();
            assert_eq!(dt.to_string(), text);
        }
    }

    #[test]
    fn test_year_zero_is_origin() {
        let dt: CimDateTime = "00000101000000.000000+000".parse().unwrap();
        assert_eq!(dt.microseconds(), 0);
    }

    #[test]
    fn test_wildcards_roundtrip() {
        let text = "2024**********.******+000";
        let dt: CimDateTime = text.parse().unwrap();
        assert_eq!(dt.wildcards(), 16);
        assert_eq!(dt.to_string(), text);

        let partial = "20241231235959.12****+000";
        let dt: CimDateTime = partial.parse().unwrap();
        assert_eq!(dt.wildcards(), 4);
        assert_eq!(dt.to_string(), partial);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("2024".parse::<CimDateTime>().is_err());
        assert!("20241301000000.000000+000".parse::<CimDateTime>().is_err());
        assert!("20240230000000.000000+000".parse::<CimDateTime>().is_err());
        assert!("2024*101000000.000000+000".parse::<CimDateTime>().is_err());
        assert!("00000001000000.000000:010".parse::<CimDateTime>().is_err());
        assert!("20240101000000.000000x000".parse::<CimDateTime>().is_err());
    }

    #[test]
    fn test_civil_conversion_agrees() {
        for days in [-719_528i64, -1, 0, 1, 11_016, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days);
        }
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(0, 1, 1), -DAYS_YEAR0_TO_EPOCH);
    }
}
