//! Commute index feed
//!
//! A single operational-tempo level on a 1..5 scale, where 1 is the most
//! unusual activity and 5 is business as usual.

use crate::client::FeedClient;
use crate::error::FetchError;
use crate::{footer, Feed, DEFAULT_BASE_URL};
use alerting::{Notification, Signal, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// Commute endpoint path
pub const COMMUTE_PATH: &str = "/api/commute-index";

/// Snapshot key of the single tracked level
pub const OPTEMPO_KEY: &str = "optempo";

/// Time window the reading applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub label: String,
    #[serde(default, rename = "hourET")]
    pub hour_et: Option<u8>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub is_weekend: Option<bool>,
}

/// Operational tempo reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Optempo {
    pub level: u8,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub description: String,
    pub time_window: TimeWindow,
}

impl Signal for Optempo {
    type Value = u8;

    fn key(&self) -> &str {
        OPTEMPO_KEY
    }

    fn value(&self) -> u8 {
        self.level
    }
}

/// Commute response body
#[derive(Debug, Clone, Deserialize)]
pub struct CommuteResponse {
    pub success: bool,
    #[serde(default)]
    pub optempo: Option<Optempo>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl CommuteResponse {
    pub fn into_snapshot(self) -> Result<Snapshot<Optempo>, FetchError> {
        match self.optempo {
            Some(optempo) if self.success => Ok(Snapshot::new(vec![optempo])?),
            _ => Err(FetchError::Malformed(
                "commute response missing optempo or unsuccessful".to_string(),
            )),
        }
    }
}

/// Commute index feed
pub struct CommuteFeed {
    client: FeedClient,
    url: String,
}

impl CommuteFeed {
    pub fn new(client: FeedClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn with_default_url(client: FeedClient) -> Self {
        Self::new(client, format!("{}{}", DEFAULT_BASE_URL, COMMUTE_PATH))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn render_at(alerts: &[Notification<'_, Optempo>], now: DateTime<Utc>) -> String {
        let mut body = String::new();
        for alert in alerts {
            let optempo = alert.entity;
            let _ = writeln!(
                body,
                "# 🚨 Pentagon Commute Alert: {} ({})",
                optempo.level, optempo.label
            );
            let _ = writeln!(body, "> **Time Window:** {}", optempo.time_window.label);
            let _ = writeln!(body, "> **Description:** {}\n", optempo.description);
        }

        body.push_str(&footer(
            "Report generated at",
            now,
            Some("https://www.pizzint.watch/"),
        ));
        body
    }
}

#[async_trait]
impl Feed for CommuteFeed {
    type Item = Optempo;

    fn name(&self) -> &str {
        "commute"
    }

    async fn fetch(&self) -> Result<Snapshot<Optempo>, FetchError> {
        let response: CommuteResponse = self.client.get_json(&self.url).await?;
        let snapshot = response.into_snapshot()?;
        debug!(
            "Commute index level {:?}",
            snapshot.entities().first().map(|o| o.level)
        );
        Ok(snapshot)
    }

    fn render(
        &self,
        alerts: &[Notification<'_, Optempo>],
        _snapshot: &Snapshot<Optempo>,
    ) -> String {
        Self::render_at(alerts, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertEngine, AlertStore, OrdinalPolicy, Tier};

    fn body(level: u8, success: bool) -> String {
        format!(
            r##"{{
                "success": {success},
                "timestamp": "2024-01-01T12:00:00Z",
                "metro": {{"current": 1, "baseline": 2, "popularityRatio": 0.5}},
                "optempo": {{
                    "color": "#22c55e",
                    "label": "Elevated",
                    "level": {level},
                    "value": 0.4,
                    "description": "Traffic well above normal",
                    "rawDeviation": 1.5,
                    "summary": {{"corridorsTotal": 4}},
                    "timeWindow": {{
                        "label": "Morning rush",
                        "hourET": 8,
                        "window": "am",
                        "isWeekend": false,
                        "expectedRatio": 1.0,
                        "sensitivityMultiplier": 1.0
                    }}
                }}
            }}"##
        )
    }

    fn parse(body: &str) -> Result<Snapshot<Optempo>, FetchError> {
        serde_json::from_str::<CommuteResponse>(body)
            .map_err(FetchError::from)?
            .into_snapshot()
    }

    #[test]
    fn test_parse_commute() {
        let snapshot = parse(&body(3, true)).unwrap();
        assert_eq!(snapshot.len(), 1);

        let optempo = &snapshot.entities()[0];
        assert_eq!(optempo.key(), OPTEMPO_KEY);
        assert_eq!(optempo.value(), 3);
        assert_eq!(optempo.time_window.label, "Morning rush");
        assert_eq!(optempo.time_window.hour_et, Some(8));
    }

    #[test]
    fn test_time_window_fields() {
        let window: TimeWindow =
            serde_json::from_str(r#"{"label": "Late night", "hourET": 23, "isWeekend": true}"#)
                .unwrap();
        assert_eq!(window.hour_et, Some(23));
        assert_eq!(window.is_weekend, Some(true));
        assert_eq!(window.window, None);

        let encoded = serde_json::to_value(&window).unwrap();
        assert_eq!(encoded["hourET"], 23);
    }

    #[test]
    fn test_unsuccessful_or_missing_is_malformed() {
        assert!(matches!(
            parse(&body(3, false)),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse(r#"{"success": true}"#),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_render_escalation() {
        let snapshot = parse(&body(3, true)).unwrap();
        let engine = AlertEngine::new(OrdinalPolicy::default());
        let mut store = AlertStore::new();
        store.upsert(OPTEMPO_KEY, Tier(4));

        let eval = engine.evaluate(&snapshot, &mut store);
        assert_eq!(eval.len(), 1);

        let text = CommuteFeed::render_at(&eval.notifications, Utc::now());
        assert!(text.starts_with("# 🚨 Pentagon Commute Alert: 3 (Elevated)\n"));
        assert!(text.contains("> **Time Window:** Morning rush"));
        assert!(text.contains("> **Description:** Traffic well above normal"));
    }
}
