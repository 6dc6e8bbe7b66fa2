//! Epoch-seconds timestamps.
//!
//! Application version records carry their dates as floating point
//! seconds since the Unix epoch in upper-case scientific notation, for
//! example `1.415215656E9` for 2014-11-05T19:27:36Z. This module decodes
//! that form and re-encodes it with millisecond precision preserved.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Minimum number of fractional digits in the encoded mantissa.
const MIN_FRACTION_DIGITS: usize = 9;

/// A UTC instant carried on the wire as epoch seconds.
///
/// Precision is milliseconds in both directions. Values that differ
/// only below the millisecond compare equal after a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSeconds(pub DateTime<Utc>);

impl EpochSeconds {
    /// Builds a timestamp from fractional epoch seconds, rounding to the
    /// nearest millisecond. Returns `None` for non-finite input or
    /// instants outside the representable range.
    #[must_use]
    pub fn from_seconds_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((secs * 1000.0).round() as i64).map(Self)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Encodes the instant in the wire form.
    ///
    /// Whole-second values render exactly as the service does, with nine
    /// fractional mantissa digits. Sub-second values keep their extra
    /// digits rather than being truncated.
    #[must_use]
    pub fn encode(&self) -> String {
        let seconds = self.timestamp_millis() as f64 / 1000.0;
        pad_mantissa(&format!("{seconds:E}"))
    }
}

impl From<DateTime<Utc>> for EpochSeconds {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for EpochSeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl std::str::FromStr for EpochSeconds {
    type Err = ParseEpochSecondsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs: f64 = s
            .trim()
            .parse()
            .map_err(|_| ParseEpochSecondsError(s.to_owned()))?;
        Self::from_seconds_f64(secs).ok_or_else(|| ParseEpochSecondsError(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for EpochSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Self::from_seconds_f64(secs)
            .ok_or_else(|| de::Error::custom(format!("epoch seconds out of range: {secs}")))
    }
}

/// The input could not be parsed as epoch seconds.
#[derive(Debug, thiserror::Error)]
#[error("invalid epoch seconds value: {0}")]
pub struct ParseEpochSecondsError(String);

/// Widens the mantissa of an upper-exp float rendering to at least
/// [`MIN_FRACTION_DIGITS`] fractional digits, so `5E0` becomes
/// `5.000000000E0` the way the service writes it.
fn pad_mantissa(encoded: &str) -> String {
    let Some((mantissa, exponent)) = encoded.split_once('E') else {
        return encoded.to_owned();
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if frac_part.len() >= MIN_FRACTION_DIGITS {
        return encoded.to_owned();
    }
    format!(
        "{int_part}.{frac_part:0<width$}E{exponent}",
        width = MIN_FRACTION_DIGITS
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn decodes_reference_timestamp() {
        let ts: EpochSeconds = "1.415215656E9".parse().unwrap();
        let want = Utc.with_ymd_and_hms(2014, 11, 5, 19, 27, 36).unwrap();
        assert_eq!(ts.0, want);
    }

    #[test]
    fn encodes_reference_timestamp() {
        let instant = Utc.with_ymd_and_hms(2014, 11, 5, 19, 27, 36).unwrap();
        assert_eq!(EpochSeconds(instant).encode(), "1.415215656E9");
    }

    #[test]
    fn round_trip_keeps_milliseconds() {
        let ts: EpochSeconds = "1.415215656123E9".parse().unwrap();
        assert_eq!(ts.timestamp_millis(), 1_415_215_656_123);
        assert_eq!(ts.encode(), "1.415215656123E9");
    }

    #[test]
    fn short_mantissas_are_padded() {
        let ts = EpochSeconds::from_seconds_f64(5.0).unwrap();
        assert_eq!(ts.encode(), "5.000000000E0");
    }

    #[test]
    fn rejects_non_finite_input() {
        assert!(EpochSeconds::from_seconds_f64(f64::NAN).is_none());
        assert!(EpochSeconds::from_seconds_f64(f64::INFINITY).is_none());
        assert!("not-a-number".parse::<EpochSeconds>().is_err());
    }

    #[test]
    fn deserialises_from_json_number() {
        #[derive(Deserialize)]
        struct Record {
            #[serde(rename = "DateCreated")]
            date_created: EpochSeconds,
        }

        let record: Record = serde_json::from_str(r#"{"DateCreated": 1.415215656E9}"#).unwrap();
        let want = Utc.with_ymd_and_hms(2014, 11, 5, 19, 27, 36).unwrap();
        assert_eq!(record.date_created.0, want);
    }
}
