//! [`SqliteLedger`]: the SQLite implementation of [`EventLedger`].

use std::path::Path;

use battrack_core::{
  code::BatteryCode,
  event::LifecycleEvent,
  ledger::EventLedger,
};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{EventRow, RawEvent, decode_code, encode_code},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A battery history ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteLedger {
  conn: tokio_rusqlite::Connection,
}

impl SqliteLedger {
  /// Open (or create) a ledger at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let ledger = Self { conn };
    ledger.init_schema().await?;
    Ok(ledger)
  }

  /// Open an in-memory ledger, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let ledger = Self { conn };
    ledger.init_schema().await?;
    Ok(ledger)
  }

  #[cfg(test)]
  pub(crate) fn conn_for_tests(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Whether `err` is the UNIQUE(battery_code, kind) constraint firing.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── EventLedger impl ────────────────────────────────────────────────────────

impl EventLedger for SqliteLedger {
  type Error = Error;

  async fn append(&self, event: LifecycleEvent) -> Result<()> {
    let row = EventRow::encode(&event)?;

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO lifecycle_events (
             battery_code, kind, timestamp, actor, location, payload_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.battery_code,
            row.kind,
            row.timestamp,
            row.actor,
            row.location,
            row.payload_json,
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      debug!(code = %event.battery_code, kind = %event.kind(), "duplicate event rejected by ledger");
      return Err(Error::Core(battrack_core::Error::DuplicateEvent {
        kind: event.kind(),
        code: event.battery_code,
      }));
    }
    Ok(())
  }

  async fn events_for(&self, code: &BatteryCode) -> Result<Vec<LifecycleEvent>> {
    let code_str = encode_code(code);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT battery_code, kind, timestamp, actor, location, payload_json
           FROM lifecycle_events
           WHERE battery_code = ?1
           ORDER BY timestamp ASC, seq ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![code_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn codes(&self) -> Result<Vec<BatteryCode>> {
    let raws: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT battery_code FROM lifecycle_events ORDER BY battery_code",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_code(s)).collect()
  }
}
