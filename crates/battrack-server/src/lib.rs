//! Server wiring for battrack.
//!
//! Holds the runtime [`ServerConfig`] and assembles the HTTP [`Router`] that
//! the `battrack-server` binary serves. Kept in a library so the wiring can
//! be exercised without binding a socket.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use battrack_core::{
  LifecycleService, code::CodeFormat, ledger::EventLedger, warranty::Clock,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BATTRACK_*` environment variables.
///
/// Nested keys use a double underscore in the environment, e.g.
/// `BATTRACK_CODE_FORMAT__REQUIRED_PREFIX=BAT`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  pub code_format: CodeFormat,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:        "127.0.0.1".to_string(),
      port:        8080,
      store_path:  PathBuf::from("battrack.db"),
      code_format: CodeFormat::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Load configuration from `path` (optional) overlaid with the environment.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config_from(config::File::from(path).required(false))
}

fn config_from<S>(file: S) -> Result<ServerConfig, config::ConfigError>
where
  S: config::Source + Send + Sync + 'static,
{
  config::Config::builder()
    .add_source(file)
    .add_source(
      config::Environment::with_prefix("BATTRACK")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the served [`Router`]: the battery API with request tracing.
pub fn router<L, C>(service: Arc<LifecycleService<L, C>>) -> Router
where
  L: EventLedger + 'static,
  C: Clock + 'static,
{
  battrack_api::api_router(service).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use battrack_store_sqlite::SqliteLedger;
  use tower::ServiceExt as _;

  fn from_toml(toml: &str) -> ServerConfig {
    config_from(config::File::from_str(toml, config::FileFormat::Toml)).unwrap()
  }

  async fn sqlite_router(format: CodeFormat) -> Router {
    let ledger = SqliteLedger::open_in_memory().await.unwrap();
    let service = LifecycleService::with_system_clock(ledger).with_code_format(format);
    router(Arc::new(service))
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.address(), "127.0.0.1:8080");
  }

  #[test]
  fn toml_overrides_nested_code_format() {
    let cfg = from_toml(
      r#"
        port       = 9000
        store_path = "/var/lib/battrack/ledger.db"

        [code_format]
        required_prefix = "BAT"
        max_len         = 12
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/battrack/ledger.db"));
    assert_eq!(cfg.code_format.required_prefix.as_deref(), Some("BAT"));
    assert_eq!(cfg.code_format.max_len, 12);
    assert_eq!(cfg.code_format.min_len, CodeFormat::default().min_len);
  }

  #[test]
  fn missing_config_file_is_not_an_error() {
    let cfg = load_config(Path::new("/nonexistent/battrack.toml")).unwrap();
    assert_eq!(cfg.port, ServerConfig::default().port);
  }

  #[test]
  fn tilde_is_left_alone_without_slash() {
    assert_eq!(expand_tilde(Path::new("~battrack.db")), PathBuf::from("~battrack.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/b.db")), PathBuf::from("/tmp/b.db"));
  }

  // ── Router ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn configured_prefix_is_enforced_by_router() {
    let format = CodeFormat {
      required_prefix: Some("BAT".into()),
      ..CodeFormat::default()
    };
    let app = sqlite_router(format).await;

    let req = Request::builder()
      .uri("/battery/scan/XYZ123")
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
      .uri("/battery/scan/bat123")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], "BAT123");
    assert_eq!(json["next_action"], "register_factory");
  }

  #[tokio::test]
  async fn registration_round_trips_through_served_router() {
    let app = sqlite_router(CodeFormat::default()).await;

    let body = serde_json::json!({
      "code": "BAT500", "actor": "line 1", "location": "Factory", "model": "M60"
    });
    let req = Request::builder()
      .method("POST")
      .uri("/battery/register")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = Request::builder().uri("/battery").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json, serde_json::json!([{ "code": "BAT500", "stage": "factory" }]));
  }

  #[tokio::test]
  async fn unknown_route_is_404() {
    let app = sqlite_router(CodeFormat::default()).await;
    let req = Request::builder().uri("/battery/sale/BAT1").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
