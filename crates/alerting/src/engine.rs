//! Threshold-Crossing Alert Engine

use crate::policy::{GateClosed, GlobalGate, ThresholdPolicy, Tier, Tracking};
use crate::snapshot::{Signal, Snapshot};
use crate::store::AlertStore;
use tracing::{debug, info};

/// Polling cadence suggested by one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cadence {
    /// Nothing is in progress; poll at the base interval
    #[default]
    Normal,
    /// Something is happening but has not fully happened; poll sooner
    Elevated,
}

/// A new notification for one entity
#[derive(Debug)]
pub struct Notification<'a, T> {
    /// The observed entity
    pub entity: &'a T,
    /// Tier that triggered the notification
    pub tier: Tier,
    /// Tier tracked before this cycle, if any
    pub previous: Option<Tier>,
}

/// Outcome of one evaluation cycle
#[derive(Debug)]
pub struct Evaluation<'a, T> {
    /// Entities requiring a new notification, in snapshot order
    pub notifications: Vec<Notification<'a, T>>,
    /// Cadence hint for the next poll
    pub cadence: Cadence,
    /// Whether the global gate allowed notifications this cycle
    pub gate_open: bool,
}

impl<'a, T> Evaluation<'a, T> {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }
}

/// Decides which entities of a snapshot warrant a new notification
#[derive(Debug, Clone)]
pub struct AlertEngine<P> {
    policy: P,
    gate: Option<GlobalGate>,
}

impl<P: ThresholdPolicy> AlertEngine<P> {
    /// Create an engine for a policy, without a global gate
    pub fn new(policy: P) -> Self {
        Self { policy, gate: None }
    }

    /// Require a global condition for notifications to be emitted
    pub fn with_gate(mut self, gate: GlobalGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn gate(&self) -> Option<&GlobalGate> {
        self.gate.as_ref()
    }

    /// Evaluate a snapshot against tracked state.
    ///
    /// Mutates `store` in place. Callers must not run two evaluations against
    /// the same store concurrently: the upsert and purge sequence is not atomic.
    pub fn evaluate<'a, T>(
        &self,
        snapshot: &'a Snapshot<T>,
        store: &mut AlertStore,
    ) -> Evaluation<'a, T>
    where
        T: Signal<Value = P::Value>,
    {
        let tracking = self.policy.tracking();
        let mut notifications = Vec::new();
        let mut cadence = Cadence::Normal;

        for entity in snapshot.entities() {
            let value = entity.value();
            if self.policy.in_watch_band(value) {
                cadence = Cadence::Elevated;
            }

            let notification = match tracking {
                Tracking::HighWater => self.step_high_water(entity, store),
                Tracking::LastObserved { baseline } => {
                    self.step_last_observed(entity, baseline, store)
                }
            };
            notifications.extend(notification);
        }

        if tracking == Tracking::HighWater {
            store.purge_missing(&snapshot.keys());
        }

        let gate_open = self
            .gate
            .as_ref()
            .map_or(true, |gate| gate.is_open(snapshot.global_level()));

        if let Some(gate) = self.gate.as_ref().filter(|_| !gate_open) {
            if !notifications.is_empty() {
                info!(
                    "Global gate closed (level {:?} > {}), withholding {} notifications",
                    snapshot.global_level(),
                    gate.max_level(),
                    notifications.len()
                );
            }
            notifications.clear();

            if gate.closed_behavior() == GateClosed::Reset && !store.is_empty() {
                debug!("Global gate closed, discarding {} tracked entities", store.len());
                store.reset();
            }
        }

        Evaluation {
            notifications,
            cadence,
            gate_open,
        }
    }

    fn step_high_water<'a, T>(
        &self,
        entity: &'a T,
        store: &mut AlertStore,
    ) -> Option<Notification<'a, T>>
    where
        T: Signal<Value = P::Value>,
    {
        let key = entity.key();
        let value = entity.value();
        let tier = self.policy.classify(value);
        let previous = store.get(key);

        if self.policy.is_alerting(tier) {
            let escalates = previous.map_or(true, |prev| self.policy.is_more_severe(tier, prev));
            if !escalates {
                debug!("{}: tier {} already notified", key, tier);
                return None;
            }

            debug!("{}: tier {} -> {} ({:?})", key, fmt_tier(previous), tier, value);
            store.upsert(key, tier);
            return Some(Notification {
                entity,
                tier,
                previous,
            });
        }

        if let Some(recorded) = previous {
            if self.policy.has_receded(value, recorded) {
                debug!(
                    "{}: cleared tier {} ({:?}, margin {})",
                    key,
                    recorded,
                    value,
                    self.policy.hysteresis_margin()
                );
                store.clear(key);
            } else {
                debug!("{}: holding tier {} inside hysteresis band", key, recorded);
            }
        }

        None
    }

    fn step_last_observed<'a, T>(
        &self,
        entity: &'a T,
        baseline: Tier,
        store: &mut AlertStore,
    ) -> Option<Notification<'a, T>>
    where
        T: Signal<Value = P::Value>,
    {
        let key = entity.key();
        let tier = self.policy.classify(entity.value());
        let previous = store.get(key).unwrap_or(baseline);

        store.upsert(key, tier);

        if self.policy.is_alerting(tier) && self.policy.is_more_severe(tier, previous) {
            debug!("{}: escalated {} -> {}", key, previous, tier);
            Some(Notification {
                entity,
                tier,
                previous: Some(previous),
            })
        } else {
            if self.policy.is_more_severe(previous, tier) {
                debug!("{}: improved {} -> {}", key, previous, tier);
            }
            None
        }
    }
}

fn fmt_tier(tier: Option<Tier>) -> String {
    tier.map_or_else(|| "-".to_string(), |t| t.to_string())
}
