//! The `EventLedger` trait and an in-memory implementation.
//!
//! The ledger is the single writable source of truth. Durable backends (e.g.
//! `battrack-store-sqlite`) implement the trait; the lifecycle service depends
//! on this abstraction, not on any concrete backend.

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, RwLock},
};

use crate::{Error, Result, code::BatteryCode, event::LifecycleEvent};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Append-only storage of lifecycle events.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait EventLedger: Send + Sync {
  /// Backend error. Converts into [`crate::Error`] so that duplicate
  /// detection performed by the backend surfaces as
  /// [`Error::DuplicateEvent`].
  type Error: std::error::Error + Send + Sync + 'static + Into<Error>;

  /// Durably append `event`.
  ///
  /// Fails with a duplicate error if an event of the same kind already exists
  /// for the event's battery code. Existing events are never touched.
  fn append(
    &self,
    event: LifecycleEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All events for `code`, ordered by timestamp and then insertion order.
  /// An unknown code yields an empty list.
  fn events_for<'a>(
    &'a self,
    code: &'a BatteryCode,
  ) -> impl Future<Output = Result<Vec<LifecycleEvent>, Self::Error>> + Send + 'a;

  /// Every code with at least one recorded event, sorted.
  fn codes(
    &self,
  ) -> impl Future<Output = Result<Vec<BatteryCode>, Self::Error>> + Send + '_;
}

// ─── In-memory ledger ────────────────────────────────────────────────────────

/// A process-local ledger. Cloning shares the underlying event map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
  events: Arc<RwLock<HashMap<BatteryCode, Vec<LifecycleEvent>>>>,
}

impl InMemoryLedger {
  pub fn new() -> Self { Self::default() }

  fn poisoned() -> Error {
    Error::Ledger("in-memory ledger lock poisoned".into())
  }
}

impl EventLedger for InMemoryLedger {
  type Error = Error;

  async fn append(&self, event: LifecycleEvent) -> Result<()> {
    let mut map = self.events.write().map_err(|_| Self::poisoned())?;
    let history = map.entry(event.battery_code.clone()).or_default();

    let kind = event.kind();
    if history.iter().any(|e| e.kind() == kind) {
      return Err(Error::DuplicateEvent {
        code: event.battery_code,
        kind,
      });
    }

    // Keep the vec sorted by timestamp; equal timestamps stay in insertion
    // order because the new event goes after every event not later than it.
    let at = history.partition_point(|e| e.timestamp <= event.timestamp);
    history.insert(at, event);
    Ok(())
  }

  async fn events_for(&self, code: &BatteryCode) -> Result<Vec<LifecycleEvent>> {
    let map = self.events.read().map_err(|_| Self::poisoned())?;
    Ok(map.get(code).cloned().unwrap_or_default())
  }

  async fn codes(&self) -> Result<Vec<BatteryCode>> {
    let map = self.events.read().map_err(|_| Self::poisoned())?;
    let mut codes: Vec<BatteryCode> = map.keys().cloned().collect();
    codes.sort();
    Ok(codes)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone as _, Utc};

  use super::*;
  use crate::{
    code::validate,
    event::{
      Condition, EventKind, EventPayload, ManufactureDetails, Origin,
      StoreReceiptDetails,
    },
  };

  fn at(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, d, 9, 0, 0).unwrap()
  }

  fn made(code: &str, when: DateTime<Utc>, model: &str) -> LifecycleEvent {
    LifecycleEvent::new(
      validate(code).unwrap(),
      when,
      Origin::new("line 1", "Factory"),
      EventPayload::Manufactured(ManufactureDetails {
        model:    model.into(),
        batch:    None,
        comments: None,
      }),
    )
  }

  fn received(code: &str, when: DateTime<Utc>) -> LifecycleEvent {
    LifecycleEvent::new(
      validate(code).unwrap(),
      when,
      Origin::new("clerk", "Loja Central"),
      EventPayload::ReceivedAtStore(StoreReceiptDetails {
        store_id:    "S01".into(),
        received_by: None,
        condition:   Condition::Good,
        comments:    None,
      }),
    )
  }

  #[tokio::test]
  async fn unknown_code_has_no_events() {
    let ledger = InMemoryLedger::new();
    let events = ledger.events_for(&validate("BAT1").unwrap()).await.unwrap();
    assert!(events.is_empty());
    assert!(ledger.codes().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn second_event_of_same_kind_is_duplicate() {
    let ledger = InMemoryLedger::new();
    ledger.append(made("BAT1", at(1), "M60")).await.unwrap();

    let err = ledger.append(made("BAT1", at(2), "M70")).await.unwrap_err();
    assert!(matches!(
      err,
      Error::DuplicateEvent { kind: EventKind::Manufactured, .. }
    ));

    let events = ledger.events_for(&validate("BAT1").unwrap()).await.unwrap();
    assert_eq!(events.len(), 1);
  }

  #[tokio::test]
  async fn events_come_back_in_timestamp_order() {
    let ledger = InMemoryLedger::new();
    ledger.append(received("BAT1", at(5))).await.unwrap();
    ledger.append(made("BAT1", at(1), "M60")).await.unwrap();

    let kinds: Vec<EventKind> = ledger
      .events_for(&validate("bat1").unwrap())
      .await
      .unwrap()
      .iter()
      .map(LifecycleEvent::kind)
      .collect();
    assert_eq!(kinds, [EventKind::Manufactured, EventKind::ReceivedAtStore]);
  }

  #[tokio::test]
  async fn equal_timestamps_keep_insertion_order() {
    let ledger = InMemoryLedger::new();
    ledger.append(received("BAT1", at(3))).await.unwrap();
    ledger.append(made("BAT1", at(3), "M60")).await.unwrap();

    let kinds: Vec<EventKind> = ledger
      .events_for(&validate("BAT1").unwrap())
      .await
      .unwrap()
      .iter()
      .map(LifecycleEvent::kind)
      .collect();
    assert_eq!(kinds, [EventKind::ReceivedAtStore, EventKind::Manufactured]);
  }

  #[tokio::test]
  async fn codes_are_independent_and_sorted() {
    let ledger = InMemoryLedger::new();
    ledger.append(made("BAT2", at(1), "M60")).await.unwrap();
    ledger.append(made("BAT1", at(1), "M60")).await.unwrap();

    let codes = ledger.codes().await.unwrap();
    let codes: Vec<&str> = codes.iter().map(BatteryCode::as_str).collect();
    assert_eq!(codes, ["BAT1", "BAT2"]);
  }
}
