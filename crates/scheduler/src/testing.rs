//! Scripted collaborators for monitor tests

use alerting::{Notification, Signal, Snapshot};
use async_trait::async_trait;
use feeds::{Feed, FetchError};
use notifier::{DeliveryError, Notifier};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Reading {
    pub key: String,
    pub value: f64,
}

impl Signal for Reading {
    type Value = f64;

    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> f64 {
        self.value
    }
}

pub fn reading(key: &str, value: f64) -> Reading {
    Reading {
        key: key.to_string(),
        value,
    }
}

/// Feed that replays a fixed list of fetch results, then fails
pub struct ScriptedFeed {
    script: Mutex<VecDeque<Result<Vec<Reading>, FetchError>>>,
    fetched_at: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedFeed {
    pub fn new(script: Vec<Result<Vec<Reading>, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fetched_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fetch_times(&self) -> Arc<Mutex<Vec<Instant>>> {
        self.fetched_at.clone()
    }
}

#[async_trait]
impl Feed for ScriptedFeed {
    type Item = Reading;

    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self) -> Result<Snapshot<Reading>, FetchError> {
        self.fetched_at.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(readings)) => Ok(Snapshot::new(readings)?),
            Some(Err(e)) => Err(e),
            None => Err(FetchError::Network("script exhausted".to_string())),
        }
    }

    fn render(
        &self,
        alerts: &[Notification<'_, Reading>],
        _snapshot: &Snapshot<Reading>,
    ) -> String {
        alerts
            .iter()
            .map(|a| format!("{}@{}", a.entity.key, a.tier))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Notifier that records every batch it is handed
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    attempts: Mutex<usize>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail {
            return Err(DeliveryError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
