//! Core types, rules and the lifecycle service for battrack.
//!
//! A battery moves through `Unregistered -> Factory -> Store -> Sold`. Its
//! stage and warranty are never stored; both are folded from the append-only
//! event history held by an [`ledger::EventLedger`].
//!
//! This crate is free of HTTP and database dependencies. All other crates
//! depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod code;
pub mod error;
pub mod event;
pub mod ledger;
pub mod record;
pub mod service;
pub mod stage;
pub mod warranty;

pub use error::{Error, Result};
pub use service::LifecycleService;
