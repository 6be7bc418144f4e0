//! Health log record and the value types that flow through the repository.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Default page size for `FindAndCount` when the caller gives none.
pub const DEFAULT_PAGINATION_LIMIT: u32 = 100;

/// Importance of a health event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Info,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known severities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid severity: {0}")]
pub struct InvalidSeverity(pub String);

impl FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| InvalidSeverity(s.to_string()))
    }
}

/// A persisted health log entry as returned to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthLogEntry {
    /// Random UUID assigned at write time.
    pub id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub severity: Severity,
    pub message: String,
    /// Always `None` on the read path.
    pub patient_id: Option<String>,
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Input shape for a single write. The repository assigns the id and
/// anonymizes `patient_id` before anything touches storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHealthLog {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    /// Stored as [`Severity::Info`] when unset.
    pub severity: Option<Severity>,
    pub message: String,
    pub patient_id: Option<String>,
}

/// Optional predicates for `FindAndCount`, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilters {
    pub severity: Option<Severity>,
    /// Inclusive lower bound on `timestamp`.
    pub after: Option<DateTime<Utc>>,
}

/// Page window. No upper bound is enforced on `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGINATION_LIMIT,
            offset: 0,
        }
    }
}

/// One page of rows plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPage {
    pub rows: Vec<HealthLogEntry>,
    pub count: u64,
}

/// Count per distinct value of a stats dimension.
pub type LogStats = BTreeMap<String, u64>;

/// Dimension used to group entries for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Severity,
    Source,
}

impl StatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::Severity => "severity",
            StatType::Source => "source",
        }
    }

    /// Column in `health_logs` the dimension groups by.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            StatType::Severity => "severity",
            StatType::Source => "source",
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized stats dimension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid stat type: {0}")]
pub struct InvalidStatType(pub String);

impl FromStr for StatType {
    type Err = InvalidStatType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "severity" => Ok(StatType::Severity),
            "source" => Ok(StatType::Source),
            other => Err(InvalidStatType(other.to_string())),
        }
    }
}
