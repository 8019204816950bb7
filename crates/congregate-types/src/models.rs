use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Event identifiers arrive either as numbers or strings depending on the
/// backend version, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Walkin,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Soon,
    #[serde(other)]
    Other,
}

impl AvailabilityStatus {
    /// Badge text shown on an event card.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Soon => "soon",
            Self::Other => "unavailable",
        }
    }
}

/// Read model for one entry of `GET /api/v2/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub code: String,
    pub status: EventStatus,
    pub availability_status: AvailabilityStatus,
    #[serde(default)]
    pub allowed_for: String,
    /// Campus codes, in the order the backend lists them.
    #[serde(default)]
    pub allowed_campuses: Vec<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub register_start_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub register_end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
}

impl EventRecord {
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }
}

/// Accepts RFC 3339 as well as offset-less timestamps and bare dates, both
/// read as UTC. Anything else is treated as absent so that one malformed
/// event does not fail the whole list.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(at.and_utc()));
        }
    }
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc()))
}
