use crate::config::CredentialsConfig;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tokens are treated as stale this long before the server-side expiry
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// OAuth client credentials, immutable for the lifetime of a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Both fields carry a value
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl From<&CredentialsConfig> for Credentials {
    fn from(cfg: &CredentialsConfig) -> Self {
        Self::new(cfg.client_id.clone(), cfg.client_secret.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token held in the client cache
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Token issued at `issued_at` with an optional server-declared lifetime
    ///
    /// A lifetime too large to represent is treated as no expiry.
    pub fn new(value: String, expires_in: Option<Duration>, issued_at: DateTime<Utc>) -> Self {
        let expires_at = expires_in.and_then(|ttl| {
            let usable = TimeDelta::from_std(ttl.saturating_sub(TOKEN_EXPIRY_MARGIN)).ok()?;
            issued_at.checked_add_signed(usable)
        });
        Self { value, expires_at }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Without a declared lifetime the token never goes stale on its own
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Raw price unit returned by the API, amount in ct/kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceItem {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl PriceItem {
    pub fn new(timestamp: impl Into<String>, amount: f64) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            amount: Some(amount),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionList {
    #[serde(default)]
    pub items: Vec<SubscriptionEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionEntry {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl SubscriptionEntry {
    /// String or numeric id; empty strings count as missing
    pub fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Price list as returned by the API; entries are decoded one by one
#[derive(Debug, Deserialize)]
pub(crate) struct PriceList {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl PriceList {
    /// Usable items plus a description of every entry that failed to decode
    pub fn decode_items(self) -> (Vec<PriceItem>, Vec<String>) {
        let mut items = Vec::with_capacity(self.items.len());
        let mut skipped = Vec::new();
        for raw in self.items {
            match serde_json::from_value::<PriceItem>(raw.clone()) {
                Ok(item) => items.push(item),
                Err(e) => skipped.push(format!("{} ({})", raw, e)),
            }
        }
        (items, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn credentials_completeness() {
        assert!(Credentials::new("id", "secret").is_complete());
        assert!(!Credentials::new("", "secret").is_complete());
        assert!(!Credentials::new("id", "").is_complete());
    }

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn token_without_lifetime_stays_fresh() {
        let token = AccessToken::new("abc".to_string(), None, issued());
        assert!(token.is_fresh(issued() + TimeDelta::days(365)));
        assert_eq!(token.value(), "abc");
    }

    #[test]
    fn token_inside_margin_is_stale() {
        let token = AccessToken::new("abc".to_string(), Some(Duration::from_secs(10)), issued());
        assert!(!token.is_fresh(issued()));

        let token = AccessToken::new("abc".to_string(), Some(Duration::from_secs(3600)), issued());
        assert!(token.is_fresh(issued() + TimeDelta::seconds(3569)));
        assert!(!token.is_fresh(issued() + TimeDelta::seconds(3570)));
    }

    #[test]
    fn huge_lifetime_means_no_expiry() {
        let token = AccessToken::new("abc".to_string(), Some(Duration::from_secs(u64::MAX)), issued());
        assert_eq!(token.expires_at(), None);
        assert!(token.is_fresh(issued() + TimeDelta::days(10_000)));

        // Representable as a delta but past chrono's date range
        let far = Duration::from_secs(i64::MAX as u64 / 1000);
        let token = AccessToken::new("abc".to_string(), Some(far), issued());
        assert!(token.is_fresh(issued()));
    }

    #[test]
    fn subscription_entry_ids() {
        let list: SubscriptionList =
            serde_json::from_str(r#"{"items":[{"id":"sub_1"},{"id":42},{"id":""},{}]}"#).unwrap();
        let ids: Vec<Option<String>> = list.items.iter().map(SubscriptionEntry::id).collect();
        assert_eq!(
            ids,
            vec![Some("sub_1".to_string()), Some("42".to_string()), None, None]
        );
    }

    #[test]
    fn price_items_tolerate_missing_fields() {
        let list: PriceList = serde_json::from_str(
            r#"{"items":[{"timestamp":"2024-01-15T13:00:00Z","amount":12.5},{"amount":1.0}]}"#,
        )
        .unwrap();
        let (items, skipped) = list.decode_items();
        assert!(skipped.is_empty());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], PriceItem::new("2024-01-15T13:00:00Z", 12.5));
        assert!(items[1].timestamp.is_none());

        let empty: PriceList = serde_json::from_str("{}").unwrap();
        assert!(empty.decode_items().0.is_empty());
    }

    #[test]
    fn malformed_price_item_is_skipped_alone() {
        let list: PriceList = serde_json::from_str(
            r#"{"items":[
                {"timestamp":1705323600,"amount":1.0},
                {"timestamp":"2024-01-15T14:00:00Z","amount":"cheap"},
                {"timestamp":"2024-01-15T13:00:00Z","amount":12.5}
            ]}"#,
        )
        .unwrap();
        let (items, skipped) = list.decode_items();
        assert_eq!(items, vec![PriceItem::new("2024-01-15T13:00:00Z", 12.5)]);
        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].contains("1705323600"));
    }
}
