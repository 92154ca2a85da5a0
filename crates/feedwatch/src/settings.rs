//! Process configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `FEEDWATCH__*` environment variables.

use alerting::{AlertEngine, BandedPolicy, FlagPolicy, GateClosed, GlobalGate, OrdinalPolicy};
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use scheduler::PollSchedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "FEEDWATCH_CONFIG";

/// Config file used when [`CONFIG_PATH_VAR`] is unset
pub const DEFAULT_CONFIG_FILE: &str = "feedwatch.toml";

/// Fallback variable for the webhook destination
pub const WEBHOOK_URL_VAR: &str = "DISCORD_WEBHOOK_URL";

const ENV_PREFIX: &str = "FEEDWATCH";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_INTERVAL_SECS: u64 = 15 * 60;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chat webhook destination; unset disables delivery
    pub webhook_url: Option<String>,
    /// Shared state file
    pub state_file: PathBuf,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Upstream request timeout
    pub request_timeout_secs: u64,
    pub spikes: SpikesConfig,
    pub neh: NehConfig,
    pub commute: CommuteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            state_file: PathBuf::from(storage::DEFAULT_STATE_FILE),
            log_level: "info".to_string(),
            log_json: false,
            request_timeout_secs: 10,
            spikes: SpikesConfig::default(),
            neh: NehConfig::default(),
            commute: CommuteConfig::default(),
        }
    }
}

/// Spike dashboard monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikesConfig {
    pub enabled: bool,
    /// Overrides the default dashboard URL
    pub url: Option<String>,
    pub interval_secs: u64,
    /// Alerts are emitted only while the global level is at or below this
    pub max_doughcon: u8,
}

impl Default for SpikesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            max_doughcon: 2,
        }
    }
}

impl SpikesConfig {
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule::fixed(Duration::from_secs(self.interval_secs))
    }

    pub fn engine(&self) -> Result<AlertEngine<FlagPolicy>> {
        ensure!(
            (OrdinalPolicy::MIN_LEVEL..=OrdinalPolicy::MAX_LEVEL).contains(&self.max_doughcon),
            "spikes.max_doughcon must be between {} and {}, got {}",
            OrdinalPolicy::MIN_LEVEL,
            OrdinalPolicy::MAX_LEVEL,
            self.max_doughcon
        );
        Ok(AlertEngine::new(FlagPolicy)
            .with_gate(GlobalGate::at_most(self.max_doughcon).on_closed(GateClosed::Reset)))
    }
}

/// Prediction-market index monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NehConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub interval_secs: u64,
    /// Interval while any market sits between the two cutoffs
    pub fast_interval_secs: Option<u64>,
    pub elevated: f64,
    pub critical: f64,
    pub margin: f64,
}

impl Default for NehConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            fast_interval_secs: Some(180),
            elevated: 0.65,
            critical: 0.99,
            margin: 0.10,
        }
    }
}

impl NehConfig {
    pub fn schedule(&self) -> PollSchedule {
        let base = Duration::from_secs(self.interval_secs);
        match self.fast_interval_secs {
            Some(fast) => PollSchedule::adaptive(base, Duration::from_secs(fast)),
            None => PollSchedule::fixed(base),
        }
    }

    pub fn engine(&self) -> Result<AlertEngine<BandedPolicy>> {
        let policy = BandedPolicy::new(self.elevated, self.critical, self.margin)
            .context("invalid neh thresholds")?;
        Ok(AlertEngine::new(policy))
    }
}

/// Commute index monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommuteConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub interval_secs: u64,
    /// Least severe level that still alerts
    pub ceiling: u8,
    /// Level assumed before the first reading
    pub baseline: u8,
}

impl Default for CommuteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            ceiling: 4,
            baseline: 5,
        }
    }
}

impl CommuteConfig {
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule::fixed(Duration::from_secs(self.interval_secs))
    }

    pub fn engine(&self) -> Result<AlertEngine<OrdinalPolicy>> {
        let policy = OrdinalPolicy::new(self.ceiling, self.baseline)
            .context("invalid commute levels")?;
        Ok(AlertEngine::new(policy))
    }
}

impl AppConfig {
    /// Load from the file named by `FEEDWATCH_CONFIG` (or `feedwatch.toml`)
    /// and the process environment.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::load_from(
            Path::new(&path),
            Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR),
        )?;

        if config.webhook_url.is_none() {
            config.webhook_url = std::env::var(WEBHOOK_URL_VAR)
                .ok()
                .filter(|url| !url.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Layer defaults, an optional file at `path`, and `env`
    pub fn load_from(path: &Path, env: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("failed to parse configuration")
    }

    /// Reject settings that would make a monitor spin or never run
    pub fn validate(&self) -> Result<()> {
        ensure!(self.request_timeout_secs > 0, "request_timeout_secs must be positive");
        for (name, interval) in [
            ("spikes", self.spikes.interval_secs),
            ("neh", self.neh.interval_secs),
            ("commute", self.commute.interval_secs),
        ] {
            ensure!(interval > 0, "{}.interval_secs must be positive", name);
        }
        if let Some(fast) = self.neh.fast_interval_secs {
            ensure!(fast > 0, "neh.fast_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
