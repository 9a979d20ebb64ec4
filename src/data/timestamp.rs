use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::model::ArrayValue;
use crate::error::LoadError;

/// Naive layouts tried after RFC 3339, all interpreted as UTC.
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f", // 2012-07-26T00:00:00.000000
    "%Y-%m-%d %H:%M:%S%.f", // 2012-07-26 00:00:00
    "%Y%m%dT%H%M%S%.f",     // 20120726T000000
    "%Y-%jT%H:%M:%S%.f",    // 2012-208T00:00:00 (ordinal day)
    "%Y-%m-%d",             // 2012-07-26
    "%Y%m%d",               // 20120726
    "%Y%j",                 // 2012208
];

/// Convert a stored `date` value into a UTC timestamp.
///
/// Text is parsed with [`parse_timestamp_str`]; numbers are POSIX seconds.
pub fn parse_timestamp<S: AsRef<str>>(
    value: &ArrayValue,
    formats: &[S],
) -> Result<DateTime<Utc>, LoadError> {
    if let Some(text) = value.as_text() {
        let mut items = text.iter();
        return match (items.next(), items.next()) {
            (Some(s), None) => parse_timestamp_str(s, formats),
            _ => Err(LoadError::InvalidTimestamp(value.to_string())),
        };
    }
    match value.scalar_f64() {
        Some(seconds) => from_posix_seconds(seconds),
        None => Err(LoadError::InvalidTimestamp(value.to_string())),
    }
}

/// Parse a textual timestamp: RFC 3339 first, then each naive layout as a
/// date-time, then each as a bare date at midnight. A trailing `Z` is
/// accepted on naive layouts.
pub fn parse_timestamp_str<S: AsRef<str>>(
    s: &str,
    formats: &[S],
) -> Result<DateTime<Utc>, LoadError> {
    let trimmed = s.trim_end_matches('\0').trim();
    if trimmed.is_empty() {
        return Err(LoadError::InvalidTimestamp(s.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = trimmed.trim_end_matches(['Z', 'z']);
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt.as_ref()) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt.as_ref()) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&dt));
            }
        }
    }

    Err(LoadError::InvalidTimestamp(trimmed.to_string()))
}

/// Seconds since the epoch, kept to microsecond precision.
pub fn from_posix_seconds(seconds: f64) -> Result<DateTime<Utc>, LoadError> {
    if !seconds.is_finite() {
        return Err(LoadError::InvalidTimestamp(seconds.to_string()));
    }
    let micros = (seconds * 1e6).round() as i64;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| LoadError::InvalidTimestamp(seconds.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use ndarray::{arr0, arr1};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_obspy_style_strings() {
        let f = DEFAULT_TIMESTAMP_FORMATS;
        assert_eq!(
            parse_timestamp_str("2012-07-26T00:00:00.000000Z", f).unwrap(),
            utc(2012, 7, 26, 0, 0, 0)
        );
        assert_eq!(
            parse_timestamp_str("2012-07-26T13:45:10", f).unwrap(),
            utc(2012, 7, 26, 13, 45, 10)
        );
        assert_eq!(
            parse_timestamp_str("2012-07-26 13:45:10.5", f).unwrap().nanosecond(),
            500_000_000
        );
        assert_eq!(
            parse_timestamp_str("20120726T134510", f).unwrap(),
            utc(2012, 7, 26, 13, 45, 10)
        );
    }

    #[test]
    fn bare_dates_are_midnight() {
        let f = DEFAULT_TIMESTAMP_FORMATS;
        assert_eq!(parse_timestamp_str("2012-07-26", f).unwrap(), utc(2012, 7, 26, 0, 0, 0));
        assert_eq!(parse_timestamp_str("20120726", f).unwrap(), utc(2012, 7, 26, 0, 0, 0));
    }

    #[test]
    fn ordinal_dates_are_accepted() {
        let f = DEFAULT_TIMESTAMP_FORMATS;
        let day = utc(2012, 7, 26, 0, 0, 0);
        assert_eq!(parse_timestamp_str("2012-208T00:00:00", f).unwrap(), day);
        assert_eq!(parse_timestamp_str("2012208", f).unwrap(), day);
        assert_eq!(
            parse_timestamp_str("2012-208T06:30:00.25Z", f).unwrap().hour(),
            6
        );
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let dt = parse_timestamp_str("2012-07-26T02:00:00+02:00", DEFAULT_TIMESTAMP_FORMATS);
        assert_eq!(dt.unwrap(), utc(2012, 7, 26, 0, 0, 0));
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let dt = parse_timestamp_str("2012-07-26\0\0\0", DEFAULT_TIMESTAMP_FORMATS).unwrap();
        assert_eq!(dt, utc(2012, 7, 26, 0, 0, 0));
    }

    #[test]
    fn garbage_is_rejected() {
        for s in ["", "   ", "yesterday", "2012-13-40"] {
            let err = parse_timestamp_str(s, DEFAULT_TIMESTAMP_FORMATS).unwrap_err();
            assert!(matches!(err, LoadError::InvalidTimestamp(_)), "{s:?}");
        }
    }

    #[test]
    fn numeric_values_are_posix_seconds() {
        let v = ArrayValue::Float64(arr0(1_343_260_800.25).into_dyn());
        let dt = parse_timestamp(&v, DEFAULT_TIMESTAMP_FORMATS).unwrap();
        assert_eq!(dt.timestamp(), 1_343_260_800);
        assert_eq!(dt.nanosecond(), 250_000_000);

        let v = ArrayValue::Int(arr0(0_i64).into_dyn());
        let epoch = parse_timestamp(&v, DEFAULT_TIMESTAMP_FORMATS).unwrap();
        assert_eq!(epoch, utc(1970, 1, 1, 0, 0, 0));
    }

    #[test]
    fn text_scalar_is_parsed() {
        let v = ArrayValue::Text(arr0("2012-07-26T00:00:00Z".to_string()).into_dyn());
        let dt = parse_timestamp(&v, DEFAULT_TIMESTAMP_FORMATS).unwrap();
        assert_eq!(dt, utc(2012, 7, 26, 0, 0, 0));
    }

    #[test]
    fn multi_element_values_are_rejected() {
        let v = ArrayValue::Float64(arr1(&[0.0, 1.0]).into_dyn());
        assert!(parse_timestamp(&v, DEFAULT_TIMESTAMP_FORMATS).is_err());

        let days = arr1(&["2012-07-26".to_string(), "2012-07-27".to_string()]);
        let v = ArrayValue::Text(days.into_dyn());
        assert!(parse_timestamp(&v, DEFAULT_TIMESTAMP_FORMATS).is_err());

        assert!(from_posix_seconds(f64::NAN).is_err());
    }
}
