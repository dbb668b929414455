//! Nomos Energy API integration
//!
//! OAuth2 client-credentials authentication, subscription lookup and the
//! day-ahead price series endpoint.

pub mod client;
pub mod types;

pub use client::PriceClient;
pub use types::{AccessToken, Credentials, PriceItem};

use crate::error::Result;

/// Anything that can deliver the raw price items for today and tomorrow
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self) -> Result<Vec<PriceItem>>;
}

#[async_trait::async_trait]
impl<T: PriceSource + ?Sized> PriceSource for std::sync::Arc<T> {
    async fn fetch_prices(&self) -> Result<Vec<PriceItem>> {
        (**self).fetch_prices().await
    }
}
