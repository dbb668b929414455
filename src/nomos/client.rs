use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{NomosError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::nomos::PriceSource;
use crate::nomos::types::{
    AccessToken, Credentials, PriceItem, PriceList, SubscriptionList, TokenResponse,
};
use chrono::{Days, NaiveDate};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Date format expected by the `start`/`end` query parameters
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Nomos Energy API client with token and subscription caching
///
/// The token and subscription id are fetched lazily on first use and reused
/// for the lifetime of the client. The only retry performed here is a single
/// re-authentication when the API rejects a cached token with HTTP 401.
pub struct PriceClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<AccessToken>>,
    subscription_id: Mutex<Option<String>>,
    logger: StructuredLogger,
}

impl PriceClient {
    /// Build a client (and its HTTP session) from configuration
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .user_agent(concat!("nomos-prices/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NomosError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http(
            http,
            &config.api.base_url,
            Credentials::from(&config.credentials),
            clock,
        ))
    }

    /// Client with the wall clock and a default HTTP session
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self::with_http(
            reqwest::Client::new(),
            base_url,
            credentials,
            Arc::new(SystemClock),
        )
    }

    /// Client around an existing HTTP session
    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        credentials: Credentials,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            clock,
            token: Mutex::new(None),
            subscription_id: Mutex::new(None),
            logger: get_logger("client"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the cached access token, requesting one if needed
    pub async fn authenticate(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref()
            && token.is_fresh(self.clock.now())
        {
            return Ok(token.value().to_string());
        }

        let token = self.request_token().await?;
        let value = token.value().to_string();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token if it is still the one given
    pub async fn invalidate_token(&self, stale: &str) {
        let mut slot = self.token.lock().await;
        if slot.as_ref().is_some_and(|t| t.value() == stale) {
            self.logger.info("Discarding rejected access token");
            *slot = None;
        }
    }

    async fn request_token(&self) -> Result<AccessToken> {
        if !self.credentials.is_complete() {
            return Err(NomosError::config(
                "Client ID or Client Secret not configured",
            ));
        }

        self.logger.debug("Requesting access token");
        let resp = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(
                self.credentials.client_id(),
                Some(self.credentials.client_secret()),
            )
            .header(ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| NomosError::authentication(format!("Authentication failed: {}", e)))?;

        let body: TokenResponse = decode(resp, |m| {
            NomosError::authentication(format!("Authentication failed: {}", m))
        })
        .await?;

        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                NomosError::authentication("No access token received from authentication")
            })?;

        let ttl = body.expires_in.map(Duration::from_secs);
        self.logger.info(&match ttl {
            Some(ttl) => format!("Access token obtained, expires in {}s", ttl.as_secs()),
            None => "Access token obtained".to_string(),
        });
        Ok(AccessToken::new(value, ttl, self.clock.now()))
    }

    /// Return the cached subscription id, looking it up if needed
    pub async fn subscription_id(&self) -> Result<String> {
        let mut slot = self.subscription_id.lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }

        let list: SubscriptionList = self
            .authorized_get(
                format!("{}/subscriptions", self.base_url),
                &[],
                |m| NomosError::subscription(format!("Failed to fetch subscriptions: {}", m)),
            )
            .await?;

        let first = list
            .items
            .first()
            .ok_or_else(|| NomosError::subscription("No subscriptions found"))?;
        let id = first
            .id()
            .ok_or_else(|| NomosError::subscription("Subscription ID missing in response"))?;

        self.logger
            .for_subscription(&id)
            .debug("Using subscription");
        *slot = Some(id.clone());
        Ok(id)
    }

    /// Fetch raw price items for a calendar date range
    pub async fn fetch_price_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceItem>> {
        self.authenticate().await?;
        let subscription_id = self.subscription_id().await?;

        let start = start.format(QUERY_DATE_FORMAT).to_string();
        let end = end.format(QUERY_DATE_FORMAT).to_string();
        let list: PriceList = self
            .authorized_get(
                format!("{}/subscriptions/{}/prices", self.base_url, subscription_id),
                &[("start", start.as_str()), ("end", end.as_str())],
                |m| NomosError::price_fetch(format!("Failed to fetch price series: {}", m)),
            )
            .await?;

        let logger = self.logger.for_subscription(&subscription_id);
        let (items, skipped) = list.decode_items();
        for entry in &skipped {
            logger.warn(&format!("Skipping malformed price item: {}", entry));
        }
        logger.debug(&format!(
            "Fetched {} price items for {}..{}",
            items.len(),
            start,
            end
        ));
        Ok(items)
    }

    /// The UTC calendar dates covered by [`PriceClient::fetch_prices`]
    pub fn utc_window(&self) -> Result<(NaiveDate, NaiveDate)> {
        let today = self.clock.now().date_naive();
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| NomosError::price_fetch("Date range out of bounds"))?;
        Ok((today, tomorrow))
    }

    /// Price items for today and tomorrow (UTC calendar dates)
    pub async fn fetch_prices(&self) -> Result<Vec<PriceItem>> {
        let (today, tomorrow) = self.utc_window()?;
        self.fetch_price_series(today, tomorrow).await
    }

    /// GET with the bearer token; on 401 the token is renewed and the call
    /// repeated exactly once
    async fn authorized_get<T, F>(
        &self,
        url: String,
        query: &[(&str, &str)],
        on_error: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(String) -> NomosError,
    {
        let build = |token: &str| -> RequestBuilder {
            self.http
                .get(&url)
                .bearer_auth(token)
                .header(ACCEPT, "application/json")
                .query(query)
        };

        let token = self.authenticate().await?;
        let mut resp = build(&token)
            .send()
            .await
            .map_err(|e| on_error(e.to_string()))?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            self.logger
                .warn(&format!("Access token rejected by {}, re-authenticating", url));
            self.invalidate_token(&token).await;
            let token = self.authenticate().await?;
            resp = build(&token)
                .send()
                .await
                .map_err(|e| on_error(e.to_string()))?;
        }

        decode(resp, on_error).await
    }
}

/// Check the status and deserialize the JSON body, mapping both failures
async fn decode<T, F>(resp: Response, on_error: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(String) -> NomosError,
{
    let resp = resp.error_for_status().map_err(|e| on_error(e.to_string()))?;
    resp.json::<T>().await.map_err(|e| on_error(e.to_string()))
}

#[async_trait::async_trait]
impl PriceSource for PriceClient {
    async fn fetch_prices(&self) -> Result<Vec<PriceItem>> {
        PriceClient::fetch_prices(self).await
    }
}
