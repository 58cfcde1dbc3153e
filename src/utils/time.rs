//! Timestamp helpers for transcript entries.
//!
//! Use with `#[serde(with = "crate::utils::time")]` to store an
//! `OffsetDateTime` as an RFC 3339 string.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// The current time in UTC.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Format a timestamp as a two-digit `HH:MM` wall clock.
pub fn format_clock(datetime: &OffsetDateTime) -> String {
    datetime
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| String::from("--:--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use time::macros::datetime;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Stamped {
        #[serde(with = "crate::utils::time")]
        at: OffsetDateTime,
    }

    #[test]
    fn rfc3339_round_trip() {
        let stamped = Stamped {
            at: datetime!(2025-05-14 09:05:00 UTC),
        };
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"at":"2025-05-14T09:05:00Z"}"#);
        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stamped);
    }

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(&datetime!(2025-05-14 09:05:00 UTC)), "09:05");
        assert_eq!(format_clock(&datetime!(2025-05-14 23:59:59 UTC)), "23:59");
    }
}
