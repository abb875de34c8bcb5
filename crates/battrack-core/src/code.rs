//! Battery codes: the identifier printed on (and scanned from) a battery.
//!
//! Raw input comes from a scanner or a keyboard and is untrusted. A
//! [`BatteryCode`] can only be obtained through [`CodeFormat::validate`] (or
//! the [`validate`] shorthand), so every code held by the rest of the system is
//! trimmed, uppercased and known to match the accepted format.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

pub const DEFAULT_MIN_LEN: usize = 4;
pub const DEFAULT_MAX_LEN: usize = 32;

// ─── BatteryCode ─────────────────────────────────────────────────────────────

/// A validated, case-normalised battery code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BatteryCode(String);

impl BatteryCode {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for BatteryCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for BatteryCode {
  fn as_ref(&self) -> &str { &self.0 }
}

/// Deserialisation re-normalises and rejects non-alphanumeric input, but skips
/// the length and prefix rules: those belong to the deployment's configured
/// [`CodeFormat`], and codes recorded under a looser format must stay readable.
impl<'de> Deserialize<'de> for BatteryCode {
  fn deserialize<D: Deserializer<'de>>(
    deserializer: D,
  ) -> std::result::Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    CodeFormat::lenient()
      .validate(&raw)
      .map_err(serde::de::Error::custom)
  }
}

// ─── CodeFormat ──────────────────────────────────────────────────────────────

/// The accepted shape of a battery code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeFormat {
  pub min_len:         usize,
  pub max_len:         usize,
  /// If set, normalised codes must start with this (uppercased) prefix.
  pub required_prefix: Option<String>,
}

impl Default for CodeFormat {
  fn default() -> Self {
    Self {
      min_len:         DEFAULT_MIN_LEN,
      max_len:         DEFAULT_MAX_LEN,
      required_prefix: None,
    }
  }
}

impl CodeFormat {
  /// Any non-empty alphanumeric code.
  pub fn lenient() -> Self {
    Self {
      min_len:         1,
      max_len:         usize::MAX,
      required_prefix: None,
    }
  }

  /// Trim, uppercase and check `raw` against this format.
  pub fn validate(&self, raw: &str) -> Result<BatteryCode> {
    let reject = |reason: String| Error::InvalidCodeFormat {
      raw: raw.to_owned(),
      reason,
    };

    let normalised = raw.trim().to_ascii_uppercase();

    if normalised.is_empty() {
      return Err(reject("code is empty".into()));
    }
    if let Some(bad) = normalised.chars().find(|c| !c.is_ascii_alphanumeric()) {
      return Err(reject(format!("unexpected character {bad:?}")));
    }
    if normalised.len() < self.min_len {
      return Err(reject(format!(
        "code must be at least {} characters",
        self.min_len
      )));
    }
    if normalised.len() > self.max_len {
      return Err(reject(format!(
        "code must be at most {} characters",
        self.max_len
      )));
    }
    if let Some(prefix) = &self.required_prefix {
      let prefix = prefix.to_ascii_uppercase();
      if !normalised.starts_with(&prefix) {
        return Err(reject(format!("code must start with {prefix:?}")));
      }
    }

    Ok(BatteryCode(normalised))
  }
}

/// Validate `raw` against the default [`CodeFormat`].
pub fn validate(raw: &str) -> Result<BatteryCode> {
  CodeFormat::default().validate(raw)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalises_whitespace_and_case() {
    assert_eq!(validate(" bat123 ").unwrap(), validate("BAT123").unwrap());
    assert_eq!(validate("\tbat123\n").unwrap().as_str(), "BAT123");
  }

  #[test]
  fn rejects_empty_and_blank() {
    assert!(matches!(validate(""), Err(Error::InvalidCodeFormat { .. })));
    assert!(matches!(validate("   "), Err(Error::InvalidCodeFormat { .. })));
  }

  #[test]
  fn rejects_short_codes() {
    assert!(matches!(validate("BA1"), Err(Error::InvalidCodeFormat { .. })));
    assert!(validate("BAT1").is_ok());
  }

  #[test]
  fn rejects_non_alphanumeric() {
    let err = validate("BAT-123").unwrap_err();
    assert!(
      matches!(err, Error::InvalidCodeFormat { ref raw, .. } if raw == "BAT-123")
    );
    assert!(validate("BAT 123").is_err());
    assert!(validate("BATÉ123").is_err());
  }

  #[test]
  fn rejects_long_codes() {
    let long = "B".repeat(DEFAULT_MAX_LEN + 1);
    assert!(validate(&long).is_err());
  }

  #[test]
  fn required_prefix_is_case_insensitive() {
    let format = CodeFormat {
      required_prefix: Some("bat".into()),
      ..CodeFormat::default()
    };
    assert_eq!(format.validate("bat9001").unwrap().as_str(), "BAT9001");
    assert!(format.validate("XYZ9001").is_err());
  }

  #[test]
  fn deserialize_validates() {
    let code: BatteryCode = serde_json::from_str("\" bat42 \"").unwrap();
    assert_eq!(code.as_str(), "BAT42");
    assert!(serde_json::from_str::<BatteryCode>("\"bat-1\"").is_err());
    assert!(serde_json::from_str::<BatteryCode>("\"\"").is_err());
  }
}
