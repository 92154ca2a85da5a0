//! Feed Watch
//!
//! Wires the configured feeds, engines, and webhook notifier into one
//! scheduler per process.

mod logging;
pub mod settings;

pub use logging::init_logging;
pub use settings::AppConfig;

use alerting::{FlagPolicy, Notification, Snapshot};
use anyhow::{Context, Result};
use chrono::Utc;
use feeds::commute::CommuteFeed;
use feeds::neh::NehFeed;
use feeds::spikes::{sample_places, SpikeFeed};
use feeds::FeedClient;
use notifier::{Notifier, WebhookConfig, WebhookNotifier};
use scheduler::{Monitor, Scheduler};
use std::sync::Arc;
use storage::StateFile;
use tracing::info;

/// Persistence key of the spike monitor
pub const SPIKES_STATE_KEY: &str = "spikeAlert";
/// Persistence key of the NEH monitor
pub const NEH_STATE_KEY: &str = "nehAlert";
/// Persistence key of the commute monitor
pub const COMMUTE_STATE_KEY: &str = "optempoAlert";

/// Level shown in the sample spike notification
const SAMPLE_DOUGHCON: u8 = 3;

pub fn build_notifier(config: &AppConfig) -> WebhookNotifier {
    WebhookNotifier::new(WebhookConfig {
        url: config.webhook_url.clone(),
        timeout: config.request_timeout(),
    })
}

/// Build every enabled monitor and hand it to `scheduler`.
///
/// Invalid thresholds fail here, before any loop starts.
pub fn spawn_monitors(config: &AppConfig, scheduler: &mut Scheduler) -> Result<usize> {
    let client = FeedClient::with_timeout(config.request_timeout());

    // Build all engines first so a bad section aborts without partial startup
    let spikes_engine = config.spikes.engine()?;
    let neh_engine = config.neh.engine()?;
    let commute_engine = config.commute.engine()?;

    if config.spikes.enabled {
        let feed = match &config.spikes.url {
            Some(url) => SpikeFeed::new(client.clone(), url.clone()),
            None => SpikeFeed::with_default_url(client.clone()),
        };
        info!("Spike monitor watching {}", feed.url());
        scheduler.spawn(Monitor::new(
            feed,
            spikes_engine,
            config.spikes.schedule(),
            SPIKES_STATE_KEY,
        ));
    }

    if config.neh.enabled {
        let feed = match &config.neh.url {
            Some(url) => NehFeed::new(client.clone(), url.clone()),
            None => NehFeed::with_default_url(client.clone()),
        };
        info!("NEH monitor watching {}", feed.url());
        scheduler.spawn(Monitor::new(
            feed,
            neh_engine,
            config.neh.schedule(),
            NEH_STATE_KEY,
        ));
    }

    if config.commute.enabled {
        let feed = match &config.commute.url {
            Some(url) => CommuteFeed::new(client.clone(), url.clone()),
            None => CommuteFeed::with_default_url(client),
        };
        info!("Commute monitor watching {}", feed.url());
        scheduler.spawn(Monitor::new(
            feed,
            commute_engine,
            config.commute.schedule(),
            COMMUTE_STATE_KEY,
        ));
    }

    Ok(scheduler.len())
}

/// Render the sample spike batch without touching any tracked state
pub fn sample_alert_text() -> Result<String> {
    let snapshot = Snapshot::new(sample_places())?.with_global_level(Some(SAMPLE_DOUGHCON));
    let alerts: Vec<Notification<'_, _>> = snapshot
        .entities()
        .iter()
        .map(|place| Notification {
            entity: place,
            tier: FlagPolicy::ACTIVE,
            previous: None,
        })
        .collect();

    Ok(SpikeFeed::render_at(&alerts, &snapshot, Utc::now()))
}

/// Deliver the sample spike batch
pub async fn send_test_alert(notifier: &dyn Notifier) -> Result<()> {
    let text = sample_alert_text()?;
    info!("Sending sample alert");
    notifier
        .send(&text)
        .await
        .context("failed to deliver sample alert")
}

/// Open the shared state file named in `config`
pub fn open_state(config: &AppConfig) -> Arc<StateFile> {
    Arc::new(StateFile::new(config.state_file.clone()))
}
