// Timestamp helpers shared by the data model, storage, and reports

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to whole seconds.
///
/// Documents store second precision, so every timestamp the system creates is
/// truncated up front and a reload reproduces the in-memory value exactly.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Human-readable date used in markdown reports, e.g. `Jan 5, 2025 at 3:04 PM`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y at %-I:%M %p").to_string()
}

/// Date without time of day, e.g. `Jan 5, 2025`
pub fn format_day(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Render a duration in seconds as `2 days, 3 hours` or `45 minutes`.
///
/// Minutes are only shown for spans shorter than a day.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 && days == 0 {
        parts.push(plural(minutes, "minute"));
    }

    if parts.is_empty() {
        "Just started".to_string()
    } else {
        parts.join(", ")
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Serde adapter writing RFC 3339 UTC timestamps with second precision.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    /// Same format for optional timestamps; `None` is written as `null`.
    pub mod option {
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Secs, true)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }

    /// Timestamps used as map values, e.g. `lastUsed` in technology stats.
    pub mod map {
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::ser::SerializeMap;
        use serde::{Deserialize, Deserializer, Serializer};
        use std::collections::BTreeMap;

        pub fn serialize<S: Serializer>(
            map: &BTreeMap<String, DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut out = serializer.serialize_map(Some(map.len()))?;
            for (key, date) in map {
                out.serialize_entry(key, &date.to_rfc3339_opts(SecondsFormat::Secs, true))?;
            }
            out.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<BTreeMap<String, DateTime<Utc>>, D::Error> {
            let raw: BTreeMap<String, String> = BTreeMap::deserialize(deserializer)?;
            raw.into_iter()
                .map(|(key, value)| {
                    DateTime::parse_from_rfc3339(&value)
                        .map(|d| (key, d.with_timezone(&Utc)))
                        .map_err(serde::de::Error::custom)
                })
                .collect()
        }
    }
}
