//! Per-source Monitor

use crate::schedule::PollSchedule;
use alerting::{AlertEngine, AlertStore, Cadence, Signal, ThresholdPolicy};
use feeds::{Feed, FetchError};
use notifier::Notifier;
use std::sync::Arc;
use storage::StateFile;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Outcome of one completed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Entities in the fetched snapshot
    pub observed: usize,
    /// Entities included in the notification batch
    pub notified: usize,
    /// Records tracked after the cycle
    pub tracked: usize,
    /// Cadence hint for the next poll
    pub cadence: Cadence,
}

/// A feed bound to its engine, tracked state, and poll schedule
pub struct Monitor<F, P> {
    feed: F,
    engine: AlertEngine<P>,
    store: AlertStore,
    schedule: PollSchedule,
    /// Key under which the store is persisted
    state_key: String,
    /// Hint from the last successful cycle
    cadence: Cadence,
}

impl<F, P> Monitor<F, P>
where
    F: Feed,
    P: ThresholdPolicy<Value = <F::Item as Signal>::Value>,
{
    /// Create a monitor with empty state
    pub fn new(
        feed: F,
        engine: AlertEngine<P>,
        schedule: PollSchedule,
        state_key: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            engine,
            store: AlertStore::new(),
            schedule,
            state_key: state_key.into(),
            cadence: Cadence::Normal,
        }
    }

    pub fn name(&self) -> &str {
        self.feed.name()
    }

    pub fn state_key(&self) -> &str {
        &self.state_key
    }

    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Drop all tracked state
    pub fn reset_state(&mut self) {
        self.store.reset();
        self.cadence = Cadence::Normal;
    }

    /// Replace tracked state with what was persisted, if anything
    pub fn restore(&mut self, state: &StateFile) {
        if let Some(store) = state.load::<AlertStore>(&self.state_key) {
            info!(
                "{}: restored {} tracked entities",
                self.feed.name(),
                store.len()
            );
            self.store = store;
        }
    }

    /// Run one fetch, evaluate, notify, persist cycle.
    ///
    /// A failed fetch leaves tracked state and cadence untouched. Delivery
    /// and persistence failures are logged and do not fail the cycle.
    pub async fn cycle(
        &mut self,
        notifier: &dyn Notifier,
        state: &Arc<StateFile>,
    ) -> Result<CycleReport, FetchError> {
        let snapshot = self.feed.fetch().await?;

        let eval = self.engine.evaluate(&snapshot, &mut self.store);
        let cadence = eval.cadence;
        let notified = eval.len();
        let batch = if eval.is_empty() {
            None
        } else {
            Some(self.feed.render(&eval.notifications, &snapshot))
        };
        drop(eval);

        match batch {
            Some(text) => {
                info!("{}: {} new alerts, sending", self.feed.name(), notified);
                if let Err(e) = notifier.send(&text).await {
                    error!("{}: failed to deliver alert: {}", self.feed.name(), e);
                }
            }
            None => debug!("{}: no new alerts", self.feed.name()),
        }

        self.persist(state).await;

        self.cadence = cadence;
        Ok(CycleReport {
            observed: snapshot.len(),
            notified,
            tracked: self.store.len(),
            cadence,
        })
    }

    /// Write the store on the blocking pool; failures are only logged
    async fn persist(&self, state: &Arc<StateFile>) {
        let state = Arc::clone(state);
        let key = self.state_key.clone();
        let store = self.store.clone();

        match tokio::task::spawn_blocking(move || state.save(&key, &store)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{}: failed to persist state: {}", self.feed.name(), e),
            Err(e) => warn!("{}: persist task failed: {}", self.feed.name(), e),
        }
    }

    /// Poll until `shutdown` turns true. An in-flight cycle always completes.
    pub async fn run(
        mut self,
        notifier: Arc<dyn Notifier>,
        state: Arc<StateFile>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            "{}: polling every {:?} (fast {:?})",
            self.feed.name(),
            self.schedule.base_interval,
            self.schedule.fast_interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.cycle(notifier.as_ref(), &state).await {
                Ok(report) => info!(
                    "{}: observed {}, notified {}, tracking {}, cadence {:?}",
                    self.feed.name(),
                    report.observed,
                    report.notified,
                    report.tracked,
                    report.cadence
                ),
                Err(e) => warn!("{}: fetch failed: {}", self.feed.name(), e),
            }

            let delay = self.schedule.next_delay(self.cadence);
            debug!("{}: next poll in {:?}", self.feed.name(), delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("{}: stopped", self.feed.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reading, RecordingNotifier, ScriptedFeed};
    use alerting::{BandedPolicy, Tier};
    use std::time::Duration;

    fn monitor(feed: ScriptedFeed) -> Monitor<ScriptedFeed, BandedPolicy> {
        Monitor::new(
            feed,
            AlertEngine::new(BandedPolicy::default()),
            PollSchedule::adaptive(Duration::from_secs(60), Duration::from_secs(10)),
            "testAlert",
        )
    }

    fn state_file(dir: &tempfile::TempDir) -> Arc<StateFile> {
        Arc::new(StateFile::new(dir.path().join("state.json")))
    }

    #[tokio::test]
    async fn test_cycle_notifies_then_suppresses() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = RecordingNotifier::default();
        let feed = ScriptedFeed::new(vec![
            Ok(vec![reading("a", 0.7), reading("b", 0.1)]),
            Ok(vec![reading("a", 0.72), reading("b", 0.2)]),
        ]);
        let mut monitor = monitor(feed);

        let report = monitor.cycle(&notifier, &state).await.unwrap();
        assert_eq!(report.observed, 2);
        assert_eq!(report.notified, 1);
        assert_eq!(report.tracked, 1);
        assert_eq!(report.cadence, Cadence::Elevated);

        let report = monitor.cycle(&notifier, &state).await.unwrap();
        assert_eq!(report.notified, 0);

        let sent = notifier.sent();
        assert_eq!(sent, vec!["a@1".to_string()]);
    }

    #[tokio::test]
    async fn test_cycle_persists_store() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = RecordingNotifier::default();
        let mut monitor = monitor(ScriptedFeed::new(vec![Ok(vec![reading("a", 0.995)])]));

        monitor.cycle(&notifier, &state).await.unwrap();

        let saved = state.load::<AlertStore>("testAlert").unwrap();
        assert_eq!(saved.get("a"), Some(BandedPolicy::CRITICAL));
    }

    #[tokio::test]
    async fn test_persist_failure_does_not_fail_cycle() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the state file should be makes the final rename fail
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        let state = Arc::new(StateFile::new(&blocked));
        let notifier = RecordingNotifier::default();
        let mut monitor = monitor(ScriptedFeed::new(vec![Ok(vec![reading("a", 0.7)])]));

        let report = monitor.cycle(&notifier, &state).await.unwrap();
        assert_eq!(report.notified, 1);
        assert!(monitor.store().contains("a"));
        assert!(blocked.is_dir());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = RecordingNotifier::default();
        let feed = ScriptedFeed::new(vec![
            Ok(vec![reading("a", 0.8)]),
            Err(FetchError::Status(500)),
        ]);
        let mut monitor = monitor(feed);

        monitor.cycle(&notifier, &state).await.unwrap();
        assert_eq!(monitor.cadence(), Cadence::Elevated);

        let result = monitor.cycle(&notifier, &state).await;
        assert!(matches!(result, Err(FetchError::Status(500))));
        assert_eq!(monitor.store().get("a"), Some(BandedPolicy::ELEVATED));
        assert_eq!(monitor.cadence(), Cadence::Elevated);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_updates_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = RecordingNotifier::failing();
        let feed = ScriptedFeed::new(vec![
            Ok(vec![reading("a", 0.7)]),
            Ok(vec![reading("a", 0.7)]),
        ]);
        let mut monitor = monitor(feed);

        let report = monitor.cycle(&notifier, &state).await.unwrap();
        assert_eq!(report.notified, 1);
        assert!(monitor.store().contains("a"));

        // The failed batch is not retried
        let report = monitor.cycle(&notifier, &state).await.unwrap();
        assert_eq!(report.notified, 0);
        assert_eq!(notifier.attempts(), 1);
    }

    #[tokio::test]
    async fn test_restore_suppresses_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = RecordingNotifier::default();

        let mut first = monitor(ScriptedFeed::new(vec![Ok(vec![reading("a", 0.7)])]));
        first.cycle(&notifier, &state).await.unwrap();

        let mut second = monitor(ScriptedFeed::new(vec![Ok(vec![reading("a", 0.7)])]));
        second.restore(&state);
        assert_eq!(second.store().get("a"), Some(Tier(1)));

        let report = second.cycle(&notifier, &state).await.unwrap();
        assert_eq!(report.notified, 0);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = RecordingNotifier::default();
        let mut monitor = monitor(ScriptedFeed::new(vec![Ok(vec![reading("a", 0.8)])]));

        monitor.cycle(&notifier, &state).await.unwrap();
        monitor.reset_state();
        assert!(monitor.store().is_empty());
        assert_eq!(monitor.cadence(), Cadence::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_adapts_interval_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_file(&dir);
        let notifier = Arc::new(RecordingNotifier::default());
        let feed = ScriptedFeed::new(vec![
            Ok(vec![reading("a", 0.8)]),
            Ok(vec![reading("a", 0.8)]),
            Ok(vec![reading("a", 0.1)]),
            Ok(vec![reading("a", 0.1)]),
        ]);
        let fetch_times = feed.fetch_times();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(monitor(feed).run(notifier.clone(), state, rx));

        tokio::time::sleep(Duration::from_secs(170)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let times = fetch_times.lock().unwrap().clone();
        let gaps: Vec<u64> = times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
        assert_eq!(gaps, vec![10, 10, 60, 60]);
        assert_eq!(notifier.sent().len(), 1);
    }
}
