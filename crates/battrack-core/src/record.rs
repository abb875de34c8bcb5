//! Read models: computed views over a battery's events, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  code::BatteryCode,
  event::{Customer, EventPayload, LifecycleEvent},
  stage::{NextAction, Stage, current_stage},
  warranty::{self, WarrantyInfo},
};

// ─── BatteryRecord ───────────────────────────────────────────────────────────

/// The materialised view of one battery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryRecord {
  pub code:     BatteryCode,
  pub stage:    Stage,
  /// Full history in chronological order.
  pub events:   Vec<LifecycleEvent>,
  /// Present once the battery is sold.
  pub warranty: Option<WarrantyInfo>,
}

impl BatteryRecord {
  /// Fold an ordered history into a record, computing the warranty as of
  /// `now` if the battery has been sold.
  pub fn fold(
    code: BatteryCode,
    events: Vec<LifecycleEvent>,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let stage = current_stage(&events);
    let warranty = match stage {
      Stage::Sold => Some(warranty::for_events(&code, &events, now)?),
      _ => None,
    };
    Ok(Self { code, stage, events, warranty })
  }

  pub fn model(&self) -> Option<&str> {
    self.events.iter().find_map(|e| match &e.payload {
      EventPayload::Manufactured(m) => Some(m.model.as_str()),
      _ => None,
    })
  }

  pub fn store_id(&self) -> Option<&str> {
    self.events.iter().find_map(|e| match &e.payload {
      EventPayload::ReceivedAtStore(r) => Some(r.store_id.as_str()),
      _ => None,
    })
  }

  pub fn customer(&self) -> Option<&Customer> {
    self.events.iter().find_map(|e| e.sale().map(|s| &s.customer))
  }
}

// ─── WarrantyReport ──────────────────────────────────────────────────────────

/// Answer to a warranty check: status plus the context a counter clerk needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyReport {
  pub code:          BatteryCode,
  pub warranty:      WarrantyInfo,
  pub model:         Option<String>,
  pub store_id:      Option<String>,
  pub customer_name: Option<String>,
  /// Full history in chronological order.
  pub history:       Vec<LifecycleEvent>,
}

// ─── Scan results ────────────────────────────────────────────────────────────

/// What to do with a freshly scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResolution {
  pub code:        BatteryCode,
  pub stage:       Stage,
  pub next_action: NextAction,
}

/// One line of the battery inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatterySummary {
  pub code:  BatteryCode,
  pub stage: Stage,
}
