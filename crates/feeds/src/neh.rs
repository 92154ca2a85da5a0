//! "Nothing Ever Happens" index feed
//!
//! Prediction-market probabilities for a set of doomsday events.

use crate::client::FeedClient;
use crate::error::FetchError;
use crate::{footer, Feed, DEFAULT_BASE_URL};
use alerting::{BandedPolicy, Notification, Signal, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// Index endpoint path
pub const INDEX_PATH: &str = "/api/neh-index/doomsday";

/// Market page prefix used in notifications
pub const MARKET_URL: &str = "https://polymarket.com/event/";

/// One prediction market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub slug: String,
    pub label: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Probability in [0, 1]
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
}

impl Signal for Market {
    type Value = f64;

    fn key(&self) -> &str {
        &self.slug
    }

    fn value(&self) -> f64 {
        self.price
    }
}

/// Index response body
#[derive(Debug, Clone, Deserialize)]
pub struct IndexResponse {
    pub markets: Vec<Market>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl IndexResponse {
    pub fn into_snapshot(self) -> Result<Snapshot<Market>, FetchError> {
        if let Some(bad) = self.markets.iter().find(|m| !m.price.is_finite()) {
            return Err(FetchError::Malformed(format!(
                "non-finite price for {}",
                bad.slug
            )));
        }
        Ok(Snapshot::new(self.markets)?)
    }
}

/// NEH index feed
pub struct NehFeed {
    client: FeedClient,
    url: String,
}

impl NehFeed {
    pub fn new(client: FeedClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn with_default_url(client: FeedClient) -> Self {
        Self::new(client, format!("{}{}", DEFAULT_BASE_URL, INDEX_PATH))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn render_at(alerts: &[Notification<'_, Market>], now: DateTime<Utc>) -> String {
        let mut body = String::from("# 🚨 **SOMETHING IS HAPPENING**\n");
        let _ = writeln!(body, "**{}** event(s) monitoring active:\n", alerts.len());

        for alert in alerts {
            let market = alert.entity;
            let (icon, status) = if alert.tier == BandedPolicy::CRITICAL {
                ("🔥", "IT HAPPENED")
            } else {
                ("⚠️", "HAPPENING")
            };

            let _ = writeln!(body, "### {} **{}**", icon, market.label);
            let _ = writeln!(body, "> **Status:** {}", status);
            let _ = writeln!(body, "> **Probability:** {:.1}%", market.price * 100.0);
            let _ = writeln!(body, "> [View Market]({}{})\n", MARKET_URL, market.slug);
        }

        body.push_str(&footer("Checked at", now, None));
        body
    }
}

#[async_trait]
impl Feed for NehFeed {
    type Item = Market;

    fn name(&self) -> &str {
        "neh"
    }

    async fn fetch(&self) -> Result<Snapshot<Market>, FetchError> {
        let response: IndexResponse = self.client.get_json(&self.url).await?;
        let snapshot = response.into_snapshot()?;
        debug!("NEH index: {} markets", snapshot.len());
        Ok(snapshot)
    }

    fn render(&self, alerts: &[Notification<'_, Market>], _snapshot: &Snapshot<Market>) -> String {
        Self::render_at(alerts, Utc::now())
    }
}
