//! Lifecycle events, the fundamental unit of the battery ledger.
//!
//! An event is an immutable record that a battery reached a milestone. Events
//! are never updated or deleted; a battery's stage and warranty are always
//! recomputed from its events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantArray};

use crate::{Result, code::BatteryCode};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The milestone an event records. Each kind occurs at most once per battery.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
  VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
  Manufactured,
  ReceivedAtStore,
  Sold,
}

impl EventKind {
  /// The string stored in the `kind` column; matches the serde form.
  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Details captured when a battery is registered at the factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufactureDetails {
  pub model:    String,
  #[serde(default)]
  pub batch:    Option<String>,
  #[serde(default)]
  pub comments: Option<String>,
}

/// Physical condition of a battery as it arrives at a store.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Condition {
  #[default]
  Good,
  Damaged,
  Refurbished,
}

/// Details captured when a store receives a battery into inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceiptDetails {
  pub store_id:    String,
  #[serde(default)]
  pub received_by: Option<String>,
  #[serde(default)]
  pub condition:   Condition,
  #[serde(default)]
  pub comments:    Option<String>,
}

/// The buyer of a battery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub name:     String,
  pub phone:    String,
  #[serde(default)]
  pub email:    Option<String>,
  /// National ID or tax number, as written on the receipt.
  #[serde(default)]
  pub document: Option<String>,
}

/// Details captured at retail sale. The sale starts the warranty window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDetails {
  pub customer:         Customer,
  /// Length of the warranty window. Required; there is no default period.
  pub warranty_months:  u32,
  #[serde(default)]
  pub vehicle_model:    Option<String>,
  #[serde(default)]
  pub vehicle_plate:    Option<String>,
  #[serde(default)]
  pub sale_price_cents: Option<u64>,
  #[serde(default)]
  pub comments:         Option<String>,
}

/// The kind of an event together with its kind-specific payload.
///
/// Serialised adjacently tagged so the persisted and wire forms carry `kind`
/// as a closed string enum next to a `payload` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
  Manufactured(ManufactureDetails),
  ReceivedAtStore(StoreReceiptDetails),
  Sold(SaleDetails),
}

impl EventPayload {
  pub fn kind(&self) -> EventKind {
    match self {
      Self::Manufactured(_) => EventKind::Manufactured,
      Self::ReceivedAtStore(_) => EventKind::ReceivedAtStore,
      Self::Sold(_) => EventKind::Sold,
    }
  }

  /// Serialise the inner payload (without the kind tag) for the
  /// `payload_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("payload").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from the kind string and JSON payload stored in the database.
  pub fn from_parts(kind: &str, payload: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind, "payload": payload });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Origin ──────────────────────────────────────────────────────────────────

/// Who recorded an event, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
  pub actor:    String,
  /// Factory unit, store name, or similar.
  pub location: String,
}

impl Origin {
  pub fn new(actor: impl Into<String>, location: impl Into<String>) -> Self {
    Self { actor: actor.into(), location: location.into() }
  }
}

// ─── LifecycleEvent ──────────────────────────────────────────────────────────

/// An immutable milestone in a battery's life. Once appended to the ledger,
/// no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
  pub battery_code: BatteryCode,
  /// Assigned from the service clock when the transition was accepted.
  pub timestamp:    DateTime<Utc>,
  pub actor:        String,
  pub location:     String,
  #[serde(flatten)]
  pub payload:      EventPayload,
}

impl LifecycleEvent {
  pub fn new(
    battery_code: BatteryCode,
    timestamp: DateTime<Utc>,
    origin: Origin,
    payload: EventPayload,
  ) -> Self {
    Self {
      battery_code,
      timestamp,
      actor: origin.actor,
      location: origin.location,
      payload,
    }
  }

  pub fn kind(&self) -> EventKind { self.payload.kind() }

  /// The sale details, if this is a `Sold` event.
  pub fn sale(&self) -> Option<&SaleDetails> {
    match &self.payload {
      EventPayload::Sold(sale) => Some(sale),
      _ => None,
    }
  }
}
