//! Handlers for `/battery` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/battery` | Every known code with its stage |
//! | `POST` | `/battery/register` | Body: [`FactoryBody`]; returns 201 + record |
//! | `POST` | `/battery/store-entry` | Body: [`StoreEntryBody`] |
//! | `POST` | `/battery/sale` | Body: [`SaleBody`]; record includes warranty |
//! | `GET`  | `/battery/warranty/{code}` | 404 until the battery is sold |
//! | `GET`  | `/battery/history/{code}` | Record at any stage |
//! | `GET`  | `/battery/scan/{code}` | Stage and next action for a scanned code |

use std::sync::Arc;

use axum::{
  Json,
  extract::{FromRequest, Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use battrack_core::{
  LifecycleService,
  event::{ManufactureDetails, Origin, SaleDetails, StoreReceiptDetails},
  ledger::EventLedger,
  record::{BatteryRecord, BatterySummary, ScanResolution, WarrantyReport},
  warranty::Clock,
};
use serde::Deserialize;

use crate::error::ApiError;

type Service<L, C> = Arc<LifecycleService<L, C>>;

// ─── Request bodies ──────────────────────────────────────────────────────────

/// `Json` extractor whose rejections use the API's JSON error body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Fields shared by every registration form.
#[derive(Debug, Deserialize)]
pub struct Envelope {
  /// Raw scanned or typed code; validated by the service.
  pub code:     String,
  pub actor:    String,
  pub location: String,
}

impl Envelope {
  fn origin(&self) -> Origin { Origin::new(&self.actor, &self.location) }
}

/// JSON body accepted by `POST /battery/register`.
#[derive(Debug, Deserialize)]
pub struct FactoryBody {
  #[serde(flatten)]
  pub envelope: Envelope,
  #[serde(flatten)]
  pub details:  ManufactureDetails,
}

/// JSON body accepted by `POST /battery/store-entry`.
#[derive(Debug, Deserialize)]
pub struct StoreEntryBody {
  #[serde(flatten)]
  pub envelope: Envelope,
  #[serde(flatten)]
  pub details:  StoreReceiptDetails,
}

/// JSON body accepted by `POST /battery/sale`.
#[derive(Debug, Deserialize)]
pub struct SaleBody {
  #[serde(flatten)]
  pub envelope: Envelope,
  #[serde(flatten)]
  pub details:  SaleDetails,
}

// ─── Registrations ───────────────────────────────────────────────────────────

/// `POST /battery/register`: returns 201 + the [`BatteryRecord`].
pub async fn register_factory<L, C>(
  State(svc): State<Service<L, C>>,
  JsonBody(body): JsonBody<FactoryBody>,
) -> Result<impl IntoResponse, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  let record = svc
    .register_factory(&body.envelope.code, body.envelope.origin(), body.details)
    .await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /battery/store-entry`
pub async fn register_store_entry<L, C>(
  State(svc): State<Service<L, C>>,
  JsonBody(body): JsonBody<StoreEntryBody>,
) -> Result<Json<BatteryRecord>, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  let record = svc
    .register_store_entry(&body.envelope.code, body.envelope.origin(), body.details)
    .await?;
  Ok(Json(record))
}

/// `POST /battery/sale`
pub async fn register_sale<L, C>(
  State(svc): State<Service<L, C>>,
  JsonBody(body): JsonBody<SaleBody>,
) -> Result<Json<BatteryRecord>, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  let record = svc
    .register_sale(&body.envelope.code, body.envelope.origin(), body.details)
    .await?;
  Ok(Json(record))
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// `GET /battery/warranty/{code}`
pub async fn warranty<L, C>(
  State(svc): State<Service<L, C>>,
  Path(code): Path<String>,
) -> Result<Json<WarrantyReport>, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  Ok(Json(svc.check_warranty(&code).await?))
}

/// `GET /battery/history/{code}`
pub async fn history<L, C>(
  State(svc): State<Service<L, C>>,
  Path(code): Path<String>,
) -> Result<Json<BatteryRecord>, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  Ok(Json(svc.history(&code).await?))
}

/// `GET /battery/scan/{code}`
pub async fn scan<L, C>(
  State(svc): State<Service<L, C>>,
  Path(code): Path<String>,
) -> Result<Json<ScanResolution>, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  Ok(Json(svc.resolve_next_action(&code).await?))
}

/// `GET /battery`
pub async fn list<L, C>(
  State(svc): State<Service<L, C>>,
) -> Result<Json<Vec<BatterySummary>>, ApiError>
where
  L: EventLedger,
  C: Clock,
{
  Ok(Json(svc.batteries().await?))
}
