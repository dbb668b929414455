//! # nomos-prices - Day-ahead electricity prices from Nomos Energy
//!
//! Periodically retrieves the day-ahead price series of a Nomos Energy
//! subscription and exposes it as hour-keyed values for today and tomorrow in
//! a fixed local timezone, together with the current-hour price and refresh
//! diagnostics.
//!
//! ## Architecture
//!
//! - `nomos`: OAuth2 client-credentials authentication and price API client
//! - `aggregator`: UTC-to-local bucketing into `today_HH` / `tomorrow_HH` keys
//! - `snapshot`: dense, always complete snapshot model and sensor descriptors
//! - `coordinator`: periodic refresh scheduling and last-good-snapshot retention
//! - `clock`: injectable time source
//! - `web`: HTTP API rendering each value (feature `web`)
//! - `config`: YAML configuration with environment overrides
//! - `logging`: structured logging and tracing

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod nomos;
pub mod snapshot;
#[cfg(feature = "web")]
pub mod web;

#[cfg(all(test, feature = "web"))]
mod web_tests;

// Re-export commonly used types
pub use aggregator::PriceAggregator;
pub use config::Config;
pub use coordinator::PriceCoordinator;
pub use error::{NomosError, Result};
pub use nomos::{PriceClient, PriceSource};
pub use snapshot::PriceSnapshot;
