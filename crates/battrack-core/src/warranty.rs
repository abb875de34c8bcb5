//! Warranty computation.
//!
//! A warranty window opens at the `sold` event and lasts a whole number of
//! calendar months. Nothing here is persisted: [`WarrantyInfo`] is recomputed
//! from the sale event against an injected [`Clock`] every time it is asked
//! for.

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  code::BatteryCode,
  event::LifecycleEvent,
  stage::{Stage, current_stage},
};

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of "now" for warranty checks and event timestamps.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock frozen at a fixed instant. Used by tests and replay tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { self.0 }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
  fn now(&self) -> DateTime<Utc> { (**self).now() }
}

// ─── WarrantyInfo ────────────────────────────────────────────────────────────

/// Warranty status of a sold battery as of a particular instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyInfo {
  pub sale_date:              DateTime<Utc>,
  pub warranty_period_months: u32,
  pub expiry_date:            DateTime<Utc>,
  /// `as_of < expiry_date`; the expiry instant itself is already expired.
  pub is_valid:               bool,
  /// Whole days left, rounded up. Zero once expired.
  pub remaining_days:         u64,
  /// The instant this status was computed for.
  pub as_of:                  DateTime<Utc>,
}

/// Add `months` calendar months to `start`, clamping the day of month to the
/// end of a shorter month (Jan 31 + 1 month = Feb 28/29).
pub fn expiry_date(start: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
  if months == 0 {
    return Err(Error::InvalidWarrantyPeriod { months });
  }
  start
    .checked_add_months(Months::new(months))
    .ok_or(Error::InvalidWarrantyPeriod { months })
}

fn ceil_days(delta: TimeDelta) -> u64 {
  let whole = delta.num_days();
  let days = if delta > TimeDelta::days(whole) { whole + 1 } else { whole };
  u64::try_from(days).unwrap_or(0)
}

/// Compute the warranty status of `sale` at `now`.
///
/// Fails with [`Error::NoSaleRecorded`] if `sale` is not a `sold` event.
pub fn compute(sale: &LifecycleEvent, now: DateTime<Utc>) -> Result<WarrantyInfo> {
  let details = sale.sale().ok_or_else(|| Error::NoSaleRecorded {
    code:  sale.battery_code.clone(),
    stage: Stage::reached_by(sale.kind()),
  })?;

  let months = details.warranty_months;
  let expiry = expiry_date(sale.timestamp, months)?;
  let is_valid = now < expiry;

  Ok(WarrantyInfo {
    sale_date: sale.timestamp,
    warranty_period_months: months,
    expiry_date: expiry,
    is_valid,
    remaining_days: if is_valid { ceil_days(expiry - now) } else { 0 },
    as_of: now,
  })
}

/// Compute the warranty status from a battery's full history, using the most
/// recent `sold` event.
pub fn for_events(
  code: &BatteryCode,
  events: &[LifecycleEvent],
  now: DateTime<Utc>,
) -> Result<WarrantyInfo> {
  let sale = events
    .iter()
    .rev()
    .find(|e| e.sale().is_some())
    .ok_or_else(|| Error::NoSaleRecorded {
      code:  code.clone(),
      stage: current_stage(events),
    })?;
  compute(sale, now)
}
