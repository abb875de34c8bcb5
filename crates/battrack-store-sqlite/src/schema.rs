//! SQL schema for the battrack SQLite ledger.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Lifecycle events are strictly append-only.
-- `seq` breaks timestamp ties in insertion order.
CREATE TABLE IF NOT EXISTS lifecycle_events (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    battery_code  TEXT NOT NULL,
    kind          TEXT NOT NULL
                  CHECK (kind IN ('manufactured', 'received_at_store', 'sold')),
    timestamp     TEXT NOT NULL,   -- RFC 3339 UTC, fixed width so it sorts
    actor         TEXT NOT NULL,
    location      TEXT NOT NULL,
    payload_json  TEXT NOT NULL,   -- JSON payload (inner data only)
    UNIQUE (battery_code, kind)
);

CREATE INDEX IF NOT EXISTS lifecycle_events_code_idx
    ON lifecycle_events(battery_code, timestamp, seq);

CREATE TRIGGER IF NOT EXISTS lifecycle_events_no_update
    BEFORE UPDATE ON lifecycle_events
BEGIN
    SELECT RAISE(ABORT, 'lifecycle events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS lifecycle_events_no_delete
    BEFORE DELETE ON lifecycle_events
BEGIN
    SELECT RAISE(ABORT, 'lifecycle events are append-only');
END;

PRAGMA user_version = 1;
";
