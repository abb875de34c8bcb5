//! Async HTTP client wrapping the battrack JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use battrack_core::{
  event::{ManufactureDetails, SaleDetails, StoreReceiptDetails},
  record::{BatteryRecord, BatterySummary, ScanResolution, WarrantyReport},
};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

/// Connection settings for the battrack API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Who is recording an event and where. Sent with every registration.
#[derive(Debug, Clone, Default)]
pub struct Operator {
  pub actor:    String,
  pub location: String,
}

/// A registration body: the shared envelope plus kind-specific details.
#[derive(Serialize)]
struct Registration<'a, D> {
  code:     &'a str,
  actor:    &'a str,
  location: &'a str,
  #[serde(flatten)]
  details:  &'a D,
}

/// Error body returned by the server for any failed request.
#[derive(Deserialize)]
struct ErrorBody {
  error:   String,
  message: String,
}

/// Async HTTP client for the battrack JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .with_context(|| format!("invalid server URL {:?}", config.base_url))?;
    if base_url.cannot_be_a_base() {
      return Err(anyhow!("server URL {base_url} cannot carry a path"));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  /// Join `segments` onto the base URL, percent-encoding each one.
  pub(crate) fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  // ── Registrations ─────────────────────────────────────────────────────────

  /// `POST /battery/register`
  pub async fn register_factory(
    &self,
    code: &str,
    operator: &Operator,
    details: &ManufactureDetails,
  ) -> Result<BatteryRecord> {
    self.register(&["battery", "register"], code, operator, details).await
  }

  /// `POST /battery/store-entry`
  pub async fn register_store_entry(
    &self,
    code: &str,
    operator: &Operator,
    details: &StoreReceiptDetails,
  ) -> Result<BatteryRecord> {
    self.register(&["battery", "store-entry"], code, operator, details).await
  }

  /// `POST /battery/sale`
  pub async fn register_sale(
    &self,
    code: &str,
    operator: &Operator,
    details: &SaleDetails,
  ) -> Result<BatteryRecord> {
    self.register(&["battery", "sale"], code, operator, details).await
  }

  async fn register<D: Serialize>(
    &self,
    segments: &[&str],
    code: &str,
    operator: &Operator,
    details: &D,
  ) -> Result<BatteryRecord> {
    let url = self.url(segments);
    let body = Registration {
      code,
      actor: &operator.actor,
      location: &operator.location,
      details,
    };
    debug!(%url, code, "sending registration");
    let resp = self
      .client
      .post(url.clone())
      .json(&body)
      .send()
      .await
      .with_context(|| format!("POST {} failed", url.path()))?;
    decode(resp, "battery record").await
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  /// `GET /battery/scan/{code}`
  pub async fn scan(&self, code: &str) -> Result<ScanResolution> {
    self.get(&["battery", "scan", code], "scan result").await
  }

  /// `GET /battery/warranty/{code}`
  pub async fn warranty(&self, code: &str) -> Result<WarrantyReport> {
    self.get(&["battery", "warranty", code], "warranty report").await
  }

  /// `GET /battery/history/{code}`
  pub async fn history(&self, code: &str) -> Result<BatteryRecord> {
    self.get(&["battery", "history", code], "battery record").await
  }

  /// `GET /battery`
  pub async fn list(&self) -> Result<Vec<BatterySummary>> {
    self.get(&["battery"], "battery list").await
  }

  async fn get<T: DeserializeOwned>(&self, segments: &[&str], what: &str) -> Result<T> {
    let url = self.url(segments);
    let resp = self
      .client
      .get(url.clone())
      .send()
      .await
      .with_context(|| format!("GET {} failed", url.path()))?;
    decode(resp, what).await
  }
}

/// Deserialise a success body, or turn the server's error body into an
/// `anyhow` error carrying its kind and message.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  let status = resp.status();
  if status.is_success() {
    return resp
      .json()
      .await
      .with_context(|| format!("deserialising {what}"));
  }

  match resp.json::<ErrorBody>().await {
    Ok(body) => Err(anyhow!("{} ({status}): {}", body.error, body.message)),
    Err(_) => Err(anyhow!("request for {what} failed: {status}")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> ApiClient {
    ApiClient::new(ApiConfig { base_url: base.into() }).unwrap()
  }

  #[test]
  fn url_joins_segments_onto_base() {
    let c = client("http://localhost:8080");
    assert_eq!(
      c.url(&["battery", "scan", "BAT1"]).as_str(),
      "http://localhost:8080/battery/scan/BAT1"
    );
  }

  #[test]
  fn url_keeps_base_path_prefix() {
    let c = client("https://example.test/tracking/");
    assert_eq!(
      c.url(&["battery"]).as_str(),
      "https://example.test/tracking/battery"
    );
  }

  #[test]
  fn url_percent_encodes_scanned_codes() {
    let c = client("http://localhost:8080");
    assert_eq!(
      c.url(&["battery", "history", "BAT/1 2"]).as_str(),
      "http://localhost:8080/battery/history/BAT%2F1%202"
    );
  }

  #[test]
  fn invalid_base_url_is_rejected() {
    assert!(ApiClient::new(ApiConfig { base_url: "not a url".into() }).is_err());
    assert!(ApiClient::new(ApiConfig { base_url: "mailto:x@y".into() }).is_err());
  }

  #[test]
  fn registration_flattens_details() {
    let details = ManufactureDetails {
      model:    "M60".into(),
      batch:    Some("L1".into()),
      comments: None,
    };
    let body = Registration {
      code:     "BAT1",
      actor:    "line 1",
      location: "Factory",
      details:  &details,
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["code"], "BAT1");
    assert_eq!(json["model"], "M60");
    assert_eq!(json["batch"], "L1");
    assert!(json.get("details").is_none());
  }
}
