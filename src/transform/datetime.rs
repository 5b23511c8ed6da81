//! Datetime parsing and the canonical datetime rendering.
//!
//! Datetimes are stored as `YYYY-MM-DDTHH:MM:SS` strings in UTC, truncated
//! to whole seconds.

use crate::transform::CastError;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// e.g. "+3d", "-2h", "10m"
static RELATIVE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-+]?)(\d+)([smhdMy])$").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%B %d, %Y"];

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn now() -> String {
    format_datetime(Utc::now().naive_utc())
}

pub fn today() -> String {
    format_datetime(Utc::now().date_naive().and_time(NaiveTime::MIN))
}

/// Parse an absolute or relative (`[+-]N[smhdMy]`) datetime.
///
/// Offsets in RFC 3339 input are normalized to UTC.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, CastError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CastError::new("datetime string can not be empty"));
    }

    if let Some(caps) = RELATIVE_REGEX.captures(text) {
        return relative_to(Utc::now().naive_utc(), &caps[1], &caps[2], &caps[3]);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }

    Err(CastError::new(format!(
        "datetime string `{text}` not recognized as datetime, did you miss +- signs for relative dates?"
    )))
}

fn relative_to(base: NaiveDateTime, sign: &str, amount: &str, unit: &str) -> Result<NaiveDateTime, CastError> {
    let overflow = || CastError::new(format!("relative datetime `{sign}{amount}{unit}` is out of range"));
    let amount: i64 = amount.parse().map_err(|_| overflow())?;
    let negative = sign == "-";

    let shifted = match unit {
        "M" | "y" => {
            let months = if unit == "y" { amount.checked_mul(12) } else { Some(amount) };
            let months = months
                .and_then(|m| u32::try_from(m).ok())
                .map(Months::new)
                .ok_or_else(overflow)?;
            if negative {
                base.checked_sub_months(months)
            } else {
                base.checked_add_months(months)
            }
        }
        _ => {
            let seconds = match unit {
                "s" => Some(amount),
                "m" => amount.checked_mul(60),
                "h" => amount.checked_mul(3_600),
                _ => amount.checked_mul(86_400),
            };
            let delta = seconds.and_then(Duration::try_seconds).ok_or_else(overflow)?;
            if negative {
                base.checked_sub_signed(delta)
            } else {
                base.checked_add_signed(delta)
            }
        }
    };

    shifted.ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_forms() {
        let expected = "2021-03-04T05:06:07";
        for input in [
            "2021-03-04T05:06:07",
            "2021-03-04 05:06:07",
            "2021-03-04T05:06:07.123456",
            "2021-03-04T05:06:07Z",
            "2021-03-04T07:06:07+02:00",
        ] {
            assert_eq!(format_datetime(parse_datetime(input).unwrap()), expected, "{input}");
        }
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(
            format_datetime(parse_datetime("2021-03-04").unwrap()),
            "2021-03-04T00:00:00"
        );
        assert_eq!(
            format_datetime(parse_datetime("2021/03/04").unwrap()),
            "2021-03-04T00:00:00"
        );
    }

    #[test]
    fn test_relative() {
        let base = parse_datetime("2021-01-31T00:00:00").unwrap();
        let shifted = relative_to(base, "+", "1", "d").unwrap();
        assert_eq!(format_datetime(shifted), "2021-02-01T00:00:00");
        let shifted = relative_to(base, "-", "2", "h").unwrap();
        assert_eq!(format_datetime(shifted), "2021-01-30T22:00:00");
        let shifted = relative_to(base, "", "1", "y").unwrap();
        assert_eq!(format_datetime(shifted), "2022-01-31T00:00:00");
        assert!(parse_datetime("-3d").is_ok());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_datetime("").is_err());
        assert!(parse_datetime("yesterday-ish").is_err());
    }

    #[test]
    fn test_now_is_canonical() {
        let stamp = now();
        assert_eq!(stamp.len(), 19);
        assert!(parse_datetime(&stamp).is_ok());
        assert!(today().ends_with("T00:00:00"));
    }
}
