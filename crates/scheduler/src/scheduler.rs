//! Monitor Supervisor

use crate::monitor::Monitor;
use alerting::{Signal, ThresholdPolicy};
use feeds::Feed;
use notifier::Notifier;
use std::sync::Arc;
use storage::StateFile;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument};

/// Owns one task per monitor and stops them together
pub struct Scheduler {
    tasks: JoinSet<()>,
    shutdown: watch::Sender<bool>,
    notifier: Arc<dyn Notifier>,
    state: Arc<StateFile>,
}

impl Scheduler {
    pub fn new(notifier: Arc<dyn Notifier>, state: Arc<StateFile>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            tasks: JoinSet::new(),
            shutdown,
            notifier,
            state,
        }
    }

    /// Restore persisted state for `monitor` and start its poll loop.
    ///
    /// Monitors never share a store, so their loops run independently.
    pub fn spawn<F, P>(&mut self, mut monitor: Monitor<F, P>)
    where
        F: Feed + 'static,
        P: ThresholdPolicy<Value = <F::Item as Signal>::Value> + Send + Sync + 'static,
    {
        monitor.restore(&self.state);

        let span = info_span!("monitor", name = %monitor.name());
        let notifier = self.notifier.clone();
        let state = self.state.clone();
        let shutdown = self.shutdown.subscribe();

        self.tasks
            .spawn(monitor.run(notifier, state, shutdown).instrument(span));
    }

    /// Number of running monitors
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every loop to stop and wait for in-flight cycles to finish
    pub async fn shutdown(mut self) {
        info!("Stopping {} monitors", self.tasks.len());
        let _ = self.shutdown.send(true);

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!("Monitor task ended abnormally: {}", e);
            }
        }
        info!("All monitors stopped");
    }
}
