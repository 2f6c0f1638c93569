//! "HH:MM" clock-time parsing shared by task records and configuration.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::ValidationError;

/// Parse a `HH:MM` (or `HH:MM:SS`) clock time.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, ValidationError> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let invalid = || ValidationError::InvalidClockTime(value.to_string());

    let (hour, minute, second) = match parts.as_slice() {
        [h, m] => (h, m, &"0"),
        [h, m, s] => (h, m, s),
        _ => return Err(invalid()),
    };

    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    let second: u32 = second.parse().map_err(|_| invalid())?;

    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid)
}

/// Combine a calendar day and a clock time into a UTC timestamp.
pub fn at(day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(time))
}

/// Serde adapter for `NaiveTime` stored as `"HH:MM"`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<NaiveTime>` stored as `"HH:MM"`.
pub mod optional_hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_clock_time(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
