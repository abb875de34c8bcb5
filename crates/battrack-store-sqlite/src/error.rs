//! Error type for `battrack-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] battrack_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown event kind in ledger: {0:?}")]
  UnknownKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain errors detected by the store (duplicates, bad codes) pass through
/// unchanged; everything else is a ledger failure.
impl From<Error> for battrack_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(core) => core,
      other => battrack_core::Error::Ledger(Box::new(other)),
    }
  }
}
