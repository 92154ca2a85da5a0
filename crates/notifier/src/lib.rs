//! Notification Delivery
//!
//! Posts rendered alert text to a chat webhook (Discord-compatible
//! `{"content": ...}` payload). Delivery is best effort:
//! - No retries; a failed batch is reported to the caller and dropped
//! - A missing destination is an error the caller logs, never a crash

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Maximum message length accepted by the webhook
pub const MAX_CONTENT_CHARS: usize = 2000;

const TRUNCATION_NOTE: &str = "\n_(truncated)_";

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Webhook destination is not configured")]
    MissingDestination,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Webhook rejected message: {status} {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one rendered batch
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Webhook configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Destination URL; `None` disables delivery
    pub url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Webhook message body
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Webhook notifier
pub struct WebhookNotifier {
    config: WebhookConfig,
    http: reqwest::Client,
}

impl WebhookNotifier {
    /// Create new webhook notifier
    pub fn new(config: WebhookConfig) -> Self {
        match &config.url {
            Some(_) => info!("Webhook notifier configured"),
            None => info!("Webhook notifier has no destination; notifications will be dropped"),
        }
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Whether a destination is configured
    pub fn is_configured(&self) -> bool {
        self.config.url.is_some()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let url = self
            .config
            .url
            .as_deref()
            .ok_or(DeliveryError::MissingDestination)?;

        let content = truncate(text, MAX_CONTENT_CHARS);
        let payload = serde_json::to_vec(&WebhookMessage { content: &content })
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .timeout(self.config.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Webhook accepted message ({} chars)", content.chars().count());
        Ok(())
    }
}

/// Cut `text` to at most `max` characters, marking the cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let keep = max.saturating_sub(TRUNCATION_NOTE.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_NOTE);
    out
}
