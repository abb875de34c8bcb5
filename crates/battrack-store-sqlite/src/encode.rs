//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so lexical order is chronological order. Payloads
//! are stored as compact JSON without their kind tag.

use battrack_core::{
  code::{BatteryCode, CodeFormat},
  event::{EventKind, EventPayload, LifecycleEvent},
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── BatteryCode ─────────────────────────────────────────────────────────────

pub fn encode_code(code: &BatteryCode) -> String { code.as_str().to_owned() }

/// Stored codes were validated on the way in, possibly under a different
/// configured format; only the structural rules are re-checked.
pub fn decode_code(s: &str) -> Result<BatteryCode> {
  Ok(CodeFormat::lenient().validate(s)?)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── EventKind ───────────────────────────────────────────────────────────────

pub fn encode_kind(kind: EventKind) -> &'static str { kind.as_str() }

pub fn decode_kind(s: &str) -> Result<EventKind> {
  s.parse().map_err(|_| Error::UnknownKind(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `lifecycle_events` row.
pub struct RawEvent {
  pub battery_code: String,
  pub kind:         String,
  pub timestamp:    String,
  pub actor:        String,
  pub location:     String,
  pub payload_json: String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      battery_code: row.get(0)?,
      kind:         row.get(1)?,
      timestamp:    row.get(2)?,
      actor:        row.get(3)?,
      location:     row.get(4)?,
      payload_json: row.get(5)?,
    })
  }

  pub fn into_event(self) -> Result<LifecycleEvent> {
    let kind = decode_kind(&self.kind)?;
    let payload_json: serde_json::Value = serde_json::from_str(&self.payload_json)?;
    let payload = EventPayload::from_parts(kind.as_str(), payload_json)?;

    Ok(LifecycleEvent {
      battery_code: decode_code(&self.battery_code)?,
      timestamp: decode_dt(&self.timestamp)?,
      actor: self.actor,
      location: self.location,
      payload,
    })
  }
}

/// Column strings for inserting one event.
pub struct EventRow {
  pub battery_code: String,
  pub kind:         &'static str,
  pub timestamp:    String,
  pub actor:        String,
  pub location:     String,
  pub payload_json: String,
}

impl EventRow {
  pub fn encode(event: &LifecycleEvent) -> Result<Self> {
    Ok(Self {
      battery_code: encode_code(&event.battery_code),
      kind:         encode_kind(event.kind()),
      timestamp:    encode_dt(event.timestamp),
      actor:        event.actor.clone(),
      location:     event.location.clone(),
      payload_json: event.payload.to_json()?.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let a = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    let b = a + chrono::TimeDelta::milliseconds(1);
    assert_eq!(encode_dt(a), "2024-01-15T09:00:00.000000Z");
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unknown_kind_is_an_error() {
    assert!(matches!(decode_kind("recycled"), Err(Error::UnknownKind(_))));
    assert_eq!(decode_kind("sold").unwrap(), EventKind::Sold);
  }
}
