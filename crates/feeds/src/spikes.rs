//! Spike dashboard feed
//!
//! Lists nearby places with a boolean spike flag, plus a global DOUGHCON
//! level where 1 is the most severe.

use crate::client::FeedClient;
use crate::error::FetchError;
use crate::{footer, Feed, DEFAULT_BASE_URL};
use alerting::{Notification, Signal, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// Dashboard endpoint path
pub const DASHBOARD_PATH: &str = "/api/dashboard-data?nocache=1";

/// Level assumed when the dashboard omits the global level
pub const DEFAULT_DOUGHCON: u8 = 5;

/// One monitored place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub current_popularity: Option<f64>,
    #[serde(default)]
    pub is_spike: bool,
    #[serde(default)]
    pub spike_magnitude: Option<f64>,
    #[serde(default)]
    pub percentage_of_usual: Option<f64>,
    #[serde(default)]
    pub recorded_at: Option<String>,
}

impl Signal for Place {
    type Value = bool;

    fn key(&self) -> &str {
        &self.place_id
    }

    fn value(&self) -> bool {
        self.is_spike
    }
}

/// Dashboard response body
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Place>,
    #[serde(default)]
    pub defcon_level: Option<u8>,
}

impl DashboardResponse {
    /// Convert into a snapshot. A missing or zero level is read as
    /// [`DEFAULT_DOUGHCON`].
    pub fn into_snapshot(self) -> Result<Snapshot<Place>, FetchError> {
        if !self.success {
            return Err(FetchError::Malformed("dashboard reported success=false".to_string()));
        }

        let level = self
            .defcon_level
            .filter(|level| *level != 0)
            .unwrap_or(DEFAULT_DOUGHCON);

        Ok(Snapshot::new(self.data)?.with_global_level(Some(level)))
    }
}

/// Spike dashboard feed
pub struct SpikeFeed {
    client: FeedClient,
    url: String,
}

impl SpikeFeed {
    pub fn new(client: FeedClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Feed against the default host
    pub fn with_default_url(client: FeedClient) -> Self {
        Self::new(client, format!("{}{}", DEFAULT_BASE_URL, DASHBOARD_PATH))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Render a batch as of `now`
    pub fn render_at(
        alerts: &[Notification<'_, Place>],
        snapshot: &Snapshot<Place>,
        now: DateTime<Utc>,
    ) -> String {
        let level = snapshot.global_level().unwrap_or(DEFAULT_DOUGHCON);

        let mut body = String::from("# 🚨 **Unusual traffic detected near the Pentagon!**\n");
        let _ = writeln!(body, "**Doughcon:** {}", level);
        let _ = writeln!(body, "**{}** places currently showing spikes:\n", alerts.len());

        for alert in alerts {
            let place = alert.entity;
            let map_link = match place.address.as_deref().filter(|a| !a.is_empty()) {
                Some(address) => format!("[Map](<{}>)", address),
                None => "No Address".to_string(),
            };
            let time = place
                .recorded_at
                .as_deref()
                .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
                .map(|at| at.with_timezone(&Utc).format("%H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "Unknown Time".to_string());
            let name = place
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or("Unknown Place");

            let _ = writeln!(body, "### 🍕 **{}**", name);
            let _ = writeln!(
                body,
                "> **Popularity:** {} | **Spike:** {} | **Normal:** {}",
                or_na(place.current_popularity, "%"),
                or_na(place.spike_magnitude, ""),
                or_na(place.percentage_of_usual, "%"),
            );
            let _ = writeln!(body, "> 📍 {} • 🕒 {}\n", map_link, time);
        }

        body.push_str(&footer(
            "Report generated at",
            now,
            Some("https://www.pizzint.watch/"),
        ));
        body
    }
}

fn or_na(value: Option<f64>, suffix: &str) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{}{}", v, suffix))
}

#[async_trait]
impl Feed for SpikeFeed {
    type Item = Place;

    fn name(&self) -> &str {
        "spikes"
    }

    async fn fetch(&self) -> Result<Snapshot<Place>, FetchError> {
        let response: DashboardResponse = self.client.get_json(&self.url).await?;
        let snapshot = response.into_snapshot()?;
        debug!(
            "Dashboard: {} places, doughcon {:?}",
            snapshot.len(),
            snapshot.global_level()
        );
        Ok(snapshot)
    }

    fn render(&self, alerts: &[Notification<'_, Place>], snapshot: &Snapshot<Place>) -> String {
        Self::render_at(alerts, snapshot, Utc::now())
    }
}

/// Sample places for a test notification
pub fn sample_places() -> Vec<Place> {
    let now = Utc::now().to_rfc3339();
    vec![
        Place {
            place_id: "mock-id-123".to_string(),
            name: Some("Joe's Pizza (Mock)".to_string()),
            address: Some("https://goo.gl/maps/mockaddress".to_string()),
            current_popularity: Some(85.0),
            is_spike: true,
            spike_magnitude: Some(30.0),
            percentage_of_usual: Some(150.0),
            recorded_at: Some(now.clone()),
        },
        Place {
            place_id: "mock-id-456".to_string(),
            name: Some("Luigi's Trattoria".to_string()),
            address: Some("https://goo.gl/maps/mockaddress2".to_string()),
            current_popularity: Some(92.0),
            is_spike: true,
            spike_magnitude: Some(45.0),
            percentage_of_usual: Some(200.0),
            recorded_at: Some(now),
        },
    ]
}
