//! JSON REST API for battrack.
//!
//! Exposes an axum [`Router`] backed by a [`LifecycleService`] over any
//! [`EventLedger`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", battrack_api::api_router(service.clone()))
//! ```

pub mod battery;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use battrack_core::{LifecycleService, ledger::EventLedger, warranty::Clock};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<L, C>(service: Arc<LifecycleService<L, C>>) -> Router<()>
where
  L: EventLedger + 'static,
  C: Clock + 'static,
{
  Router::new()
    .route("/battery", get(battery::list::<L, C>))
    .route("/battery/register", post(battery::register_factory::<L, C>))
    .route("/battery/store-entry", post(battery::register_store_entry::<L, C>))
    .route("/battery/sale", post(battery::register_sale::<L, C>))
    .route("/battery/warranty/{code}", get(battery::warranty::<L, C>))
    .route("/battery/history/{code}", get(battery::history::<L, C>))
    .route("/battery/scan/{code}", get(battery::scan::<L, C>))
    .with_state(service)
}
