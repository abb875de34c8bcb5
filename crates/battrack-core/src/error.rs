//! Error types for `battrack-core`.

use thiserror::Error;

use crate::{code::BatteryCode, event::EventKind, stage::Stage};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid battery code {raw:?}: {reason}")]
  InvalidCodeFormat { raw: String, reason: String },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("invalid warranty period of {months} months")]
  InvalidWarrantyPeriod { months: u32 },

  #[error("battery {code} is at stage {stage}; cannot record {attempted}")]
  IllegalTransition {
    code:      BatteryCode,
    stage:     Stage,
    attempted: EventKind,
  },

  #[error("battery {code} already has a {kind} event")]
  DuplicateEvent { code: BatteryCode, kind: EventKind },

  #[error("no sale recorded for battery {code} (stage {stage})")]
  NoSaleRecorded { code: BatteryCode, stage: Stage },

  #[error("ledger error: {0}")]
  Ledger(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Stable snake_case name for the error variant, used in API bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidCodeFormat { .. } => "invalid_code_format",
      Self::InvalidInput(_) => "invalid_input",
      Self::InvalidWarrantyPeriod { .. } => "invalid_warranty_period",
      Self::IllegalTransition { .. } => "illegal_transition",
      Self::DuplicateEvent { .. } => "duplicate_event",
      Self::NoSaleRecorded { .. } => "no_sale_recorded",
      Self::Ledger(_) => "ledger",
      Self::Serialization(_) => "serialization",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
