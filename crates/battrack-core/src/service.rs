//! [`LifecycleService`] holds the entry points that combine code validation, the
//! state machine, the warranty calculator and the ledger.
//!
//! Every registration reads the current stage and then conditionally appends,
//! so operations on one battery code are serialised behind a per-code async
//! lock. Different codes never contend.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, info};

use crate::{
  Error, Result,
  code::{BatteryCode, CodeFormat},
  event::{
    EventPayload, LifecycleEvent, ManufactureDetails, Origin, SaleDetails,
    StoreReceiptDetails,
  },
  ledger::EventLedger,
  record::{BatteryRecord, BatterySummary, ScanResolution, WarrantyReport},
  stage::{Stage, check_transition, current_stage},
  warranty::{self, Clock, SystemClock},
};

// ─── Per-code locks ──────────────────────────────────────────────────────────

type CodeLock = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per battery code that currently has a writer.
#[derive(Debug, Default)]
pub(crate) struct CodeLocks(Mutex<HashMap<BatteryCode, CodeLock>>);

impl CodeLocks {
  /// Register interest in `code`'s lock. The entry is pruned when the
  /// returned handle drops, including when the owning future is cancelled.
  fn enter(&self, code: &BatteryCode) -> CodeLockHandle<'_> {
    let mut map = self.0.lock().unwrap_or_else(PoisonError::into_inner);
    let lock = map.entry(code.clone()).or_default().clone();
    CodeLockHandle { locks: self, code: code.clone(), lock }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

struct CodeLockHandle<'a> {
  locks: &'a CodeLocks,
  code:  BatteryCode,
  lock:  CodeLock,
}

impl Drop for CodeLockHandle<'_> {
  fn drop(&mut self) {
    let mut map = self.locks.0.lock().unwrap_or_else(PoisonError::into_inner);
    // One reference in the map, one in this handle.
    if Arc::strong_count(&self.lock) == 2 {
      map.remove(&self.code);
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The battery lifecycle service, generic over its ledger and clock.
#[derive(Debug)]
pub struct LifecycleService<L, C = SystemClock> {
  ledger: L,
  clock:  C,
  format: CodeFormat,
  pub(crate) locks: CodeLocks,
}

impl<L: EventLedger> LifecycleService<L, SystemClock> {
  /// A service over `ledger` using the system clock and default code format.
  pub fn with_system_clock(ledger: L) -> Self { Self::new(ledger, SystemClock) }
}

impl<L, C> LifecycleService<L, C>
where
  L: EventLedger,
  C: Clock,
{
  pub fn new(ledger: L, clock: C) -> Self {
    Self {
      ledger,
      clock,
      format: CodeFormat::default(),
      locks: CodeLocks::default(),
    }
  }

  /// Replace the accepted code format.
  pub fn with_code_format(mut self, format: CodeFormat) -> Self {
    self.format = format;
    self
  }

  pub fn code_format(&self) -> &CodeFormat { &self.format }

  pub fn ledger(&self) -> &L { &self.ledger }

  /// Validate and normalise a raw scanned or typed code.
  pub fn validate(&self, raw: &str) -> Result<BatteryCode> {
    self.format.validate(raw)
  }

  // ── Commands ──────────────────────────────────────────────────────────────

  /// Record that a battery left the production line. Requires `Unregistered`.
  pub async fn register_factory(
    &self,
    raw_code: &str,
    origin: Origin,
    details: ManufactureDetails,
  ) -> Result<BatteryRecord> {
    let code = self.validate(raw_code)?;
    require("model", &details.model)?;
    self
      .record(code, origin, EventPayload::Manufactured(details))
      .await
  }

  /// Record that a store received a battery. Requires `Factory`.
  pub async fn register_store_entry(
    &self,
    raw_code: &str,
    origin: Origin,
    details: StoreReceiptDetails,
  ) -> Result<BatteryRecord> {
    let code = self.validate(raw_code)?;
    require("store_id", &details.store_id)?;
    self
      .record(code, origin, EventPayload::ReceivedAtStore(details))
      .await
  }

  /// Record a retail sale, opening the warranty window. Requires `Store`.
  pub async fn register_sale(
    &self,
    raw_code: &str,
    origin: Origin,
    details: SaleDetails,
  ) -> Result<BatteryRecord> {
    let code = self.validate(raw_code)?;
    require("customer.name", &details.customer.name)?;
    require("customer.phone", &details.customer.phone)?;
    // Rejects zero and calendar-overflowing periods before anything is written.
    warranty::expiry_date(self.clock.now(), details.warranty_months)?;
    self.record(code, origin, EventPayload::Sold(details)).await
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  /// Warranty status plus full history. Fails with
  /// [`Error::NoSaleRecorded`] unless the battery is `Sold`.
  pub async fn check_warranty(&self, raw_code: &str) -> Result<WarrantyReport> {
    let record = self.history(raw_code).await?;
    let Some(warranty) = record.warranty.clone() else {
      debug!(code = %record.code, stage = %record.stage, "warranty check before sale");
      return Err(Error::NoSaleRecorded {
        code:  record.code,
        stage: record.stage,
      });
    };

    Ok(WarrantyReport {
      model: record.model().map(str::to_owned),
      store_id: record.store_id().map(str::to_owned),
      customer_name: record.customer().map(|c| c.name.clone()),
      code: record.code,
      warranty,
      history: record.events,
    })
  }

  /// Which operation a scan of `raw_code` should lead to. No side effects.
  pub async fn resolve_next_action(&self, raw_code: &str) -> Result<ScanResolution> {
    let code = self.validate(raw_code)?;
    let events = self.load(&code).await?;
    let stage = current_stage(&events);
    Ok(ScanResolution { next_action: stage.next_action(), code, stage })
  }

  /// The full record of a battery at any stage; an unknown code yields an
  /// `Unregistered` record with no events.
  pub async fn history(&self, raw_code: &str) -> Result<BatteryRecord> {
    let code = self.validate(raw_code)?;
    let events = self.load(&code).await?;
    BatteryRecord::fold(code, events, self.clock.now())
  }

  /// Every battery the ledger knows about, with its current stage.
  pub async fn batteries(&self) -> Result<Vec<BatterySummary>> {
    let codes = self.ledger.codes().await.map_err(Into::<Error>::into)?;
    let mut out = Vec::with_capacity(codes.len());
    for code in codes {
      let events = self.load(&code).await?;
      out.push(BatterySummary { stage: current_stage(&events), code });
    }
    Ok(out)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn load(&self, code: &BatteryCode) -> Result<Vec<LifecycleEvent>> {
    self.ledger.events_for(code).await.map_err(Into::into)
  }

  async fn record(
    &self,
    code: BatteryCode,
    origin: Origin,
    payload: EventPayload,
  ) -> Result<BatteryRecord> {
    require("actor", &origin.actor)?;
    require("location", &origin.location)?;

    let entry = self.locks.enter(&code);
    let _guard = entry.lock.lock().await;
    let events = self.append_checked(&code, origin, payload).await?;
    BatteryRecord::fold(code, events, self.clock.now())
  }

  /// Check the transition against the current history and append. Must be
  /// called with the code's lock held. Returns the history read under the
  /// lock with the new event in timestamp position, so a successful append
  /// is never reported as a failure.
  async fn append_checked(
    &self,
    code: &BatteryCode,
    origin: Origin,
    payload: EventPayload,
  ) -> Result<Vec<LifecycleEvent>> {
    let kind = payload.kind();
    let mut events = self.load(code).await?;
    let stage = current_stage(&events);

    if events.iter().any(|e| e.kind() == kind) {
      debug!(%code, %kind, "rejecting duplicate lifecycle event");
      return Err(Error::DuplicateEvent { code: code.clone(), kind });
    }
    if let Err(e) = check_transition(code, stage, kind) {
      debug!(%code, %stage, %kind, "rejecting illegal transition");
      return Err(e);
    }

    let event = LifecycleEvent::new(code.clone(), self.clock.now(), origin, payload);
    self
      .ledger
      .append(event.clone())
      .await
      .map_err(Into::<Error>::into)?;
    info!(%code, %kind, to = %Stage::reached_by(kind), "recorded lifecycle event");

    let at = events.partition_point(|e| e.timestamp <= event.timestamp);
    events.insert(at, event);
    Ok(events)
  }
}

fn require(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(Error::InvalidInput(format!("{field} is required")))
  } else {
    Ok(())
  }
}
