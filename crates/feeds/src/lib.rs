//! Feed Sources
//!
//! Each feed fetches one upstream JSON endpoint, turns it into an
//! [`alerting::Snapshot`], and renders notification text for the entities
//! the engine flagged.

mod client;
mod error;

pub mod commute;
pub mod neh;
pub mod spikes;

pub use client::{FeedClient, DEFAULT_TIMEOUT_MS};
pub use error::FetchError;

use alerting::{Notification, Signal, Snapshot};
use async_trait::async_trait;

/// Default upstream host for every feed
pub const DEFAULT_BASE_URL: &str = "https://www.pizzint.watch";

/// A pollable signal source
#[async_trait]
pub trait Feed: Send + Sync {
    /// Entity type carried in each snapshot
    type Item: Signal + Send + Sync;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch a complete snapshot, or fail without a partial result
    async fn fetch(&self) -> Result<Snapshot<Self::Item>, FetchError>;

    /// Render one batch of notifications as chat-ready text
    fn render(
        &self,
        alerts: &[Notification<'_, Self::Item>],
        snapshot: &Snapshot<Self::Item>,
    ) -> String;
}

/// Shared footer with a generation timestamp
pub(crate) fn footer(
    label: &str,
    now: chrono::DateTime<chrono::Utc>,
    source: Option<&str>,
) -> String {
    let stamp = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    match source {
        Some(url) => format!("_{} {} [Source](<{}>)_", label, stamp, url),
        None => format!("_{} {}_", label, stamp),
    }
}
