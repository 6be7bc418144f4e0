//! Request payloads and their validation.
//!
//! Payloads deserialize into loosely typed DTOs (every field optional, unknown
//! fields rejected), then `validate` checks the semantic rules and converts to
//! the storage input types. All problems are collected before failing.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{LogFilters, NewHealthLog, Pagination, Severity};

/// Field-level validation failures for one request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// Body of `POST /logs`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLogsRequest {
    #[serde(default)]
    pub logs: Vec<CreateLogDto>,
}

/// One entry in a `POST /logs` body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLogDto {
    pub timestamp: Option<String>,
    pub source: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    pub patient_id: Option<String>,
}

impl CreateLogsRequest {
    /// Validate every entry and convert the batch for storage.
    pub fn validate(&self) -> Result<Vec<NewHealthLog>, ValidationErrors> {
        if self.logs.is_empty() {
            return Err(ValidationErrors::single(
                "At least one log entry is required",
            ));
        }

        let mut errors = Vec::new();
        let mut entries = Vec::with_capacity(self.logs.len());
        for (idx, dto) in self.logs.iter().enumerate() {
            if let Some(entry) = dto.validate(&format!("logs.{idx}"), &mut errors) {
                entries.push(entry);
            }
        }

        if errors.is_empty() {
            Ok(entries)
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

impl CreateLogDto {
    fn validate(&self, prefix: &str, errors: &mut Vec<String>) -> Option<NewHealthLog> {
        let before = errors.len();

        let timestamp = match self.timestamp.as_deref().map(parse_iso8601) {
            Some(Some(ts)) => Some(ts),
            _ => {
                errors.push(format!(
                    "{prefix}.timestamp must be a valid ISO 8601 date string"
                ));
                None
            }
        };
        let source = required_text(&self.source, prefix, "source", errors);
        let severity = parse_severity(self.severity.as_deref(), prefix, errors, true);
        let message = required_text(&self.message, prefix, "message", errors);
        let patient_id = match self.patient_id.as_deref() {
            Some("") => {
                errors.push(format!("{prefix}.patient_id should not be empty"));
                None
            }
            other => other.map(str::to_string),
        };

        if errors.len() != before {
            return None;
        }

        Some(NewHealthLog {
            timestamp: timestamp?,
            source: source?,
            severity,
            message: message?,
            patient_id,
        })
    }
}

fn required_text(
    value: &Option<String>,
    prefix: &str,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match value.as_deref() {
        None => {
            errors.push(format!("{prefix}.{field} must be a string"));
            None
        }
        Some("") => {
            errors.push(format!("{prefix}.{field} should not be empty"));
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

fn severity_error(field: &str) -> String {
    let allowed: Vec<&str> = Severity::ALL.iter().map(Severity::as_str).collect();
    format!(
        "{field} must be one of the following values: {}",
        allowed.join(", ")
    )
}

fn parse_severity(
    raw: Option<&str>,
    prefix: &str,
    errors: &mut Vec<String>,
    required: bool,
) -> Option<Severity> {
    let field = if prefix.is_empty() {
        "severity".to_string()
    } else {
        format!("{prefix}.severity")
    };
    match raw {
        None if !required => None,
        None => {
            errors.push(severity_error(&field));
            None
        }
        Some(raw) => match raw.parse() {
            Ok(severity) => Some(severity),
            Err(_) => {
                errors.push(severity_error(&field));
                None
            }
        },
    }
}

/// Query string of `GET /logs`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryLogsParams {
    pub severity: Option<String>,
    pub after: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl QueryLogsParams {
    /// Validate and convert into repository filters and page window.
    pub fn validate(&self) -> Result<(LogFilters, Pagination), ValidationErrors> {
        let mut errors = Vec::new();

        let severity = parse_severity(self.severity.as_deref(), "", &mut errors, false);

        let after = match self.after.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_iso8601(raw);
                if parsed.is_none() {
                    errors.push("after must be a valid ISO 8601 date string".to_string());
                }
                parsed
            }
        };

        let defaults = Pagination::default();
        let limit = parse_count(self.limit.as_deref(), "limit", &mut errors).unwrap_or(defaults.limit);
        let offset =
            parse_count(self.offset.as_deref(), "offset", &mut errors).unwrap_or(defaults.offset);

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok((LogFilters { severity, after }, Pagination { limit, offset }))
    }
}

fn parse_count(raw: Option<&str>, field: &str, errors: &mut Vec<String>) -> Option<u32> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(format!("{field} must be a non-negative integer string"));
        return None;
    }
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.push(format!("{field} is out of range"));
            None
        }
    }
}

/// Years representable in the four-digit storage form.
const STORABLE_YEARS: RangeInclusive<i32> = 0..=9999;

/// Parse an ISO 8601 date or date-time.
///
/// Accepts RFC 3339 (`2025-03-01T14:25:43Z`, `...+02:00`), a date-time without
/// offset (taken as UTC) and a bare date (midnight UTC). The UTC instant must
/// fall within years 0000 to 9999.
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    parse_any_iso8601(raw).filter(|ts| STORABLE_YEARS.contains(&ts.year()))
}

fn parse_any_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
