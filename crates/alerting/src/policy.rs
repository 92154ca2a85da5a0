//! Threshold Policies
//!
//! A policy classifies a raw signal value into a [`Tier`] and owns the
//! comparator that decides which of two tiers is worse. Scales differ in
//! direction (probabilities get worse upwards, ordinal levels downwards), so
//! the engine never compares tiers numerically on its own.

use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete severity classification produced by a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub u8);

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the engine keeps per-entity state for a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Keep the most severe notified tier until it clears or the entity disappears
    HighWater,
    /// Always keep the last observed tier, starting from `baseline`.
    /// Records survive snapshots in which the entity is missing.
    LastObserved { baseline: Tier },
}

/// Classification capability shared by every policy
pub trait ThresholdPolicy {
    /// Raw signal type the policy classifies
    type Value: Copy + fmt::Debug;

    /// Map a raw value to its tier
    fn classify(&self, value: Self::Value) -> Tier;

    /// Whether tier `a` is strictly more severe than tier `b`
    fn is_more_severe(&self, a: Tier, b: Tier) -> bool;

    /// Whether `tier` is above the "nothing happening" floor
    fn is_alerting(&self, tier: Tier) -> bool;

    /// Extra distance a value must recede past a boundary before clearing
    fn hysteresis_margin(&self) -> f64 {
        0.0
    }

    /// Whether `value` has receded far enough from `recorded` to drop the record
    fn has_receded(&self, value: Self::Value, recorded: Tier) -> bool;

    /// Whether `value` sits between the first and the last boundary
    fn in_watch_band(&self, _value: Self::Value) -> bool {
        false
    }

    /// State tracking mode used by the engine
    fn tracking(&self) -> Tracking {
        Tracking::HighWater
    }
}

/// Probability banded into none / elevated / critical
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandedPolicy {
    elevated: f64,
    critical: f64,
    margin: f64,
}

impl BandedPolicy {
    /// Below the elevated cutoff
    pub const NONE: Tier = Tier(0);
    /// At or above the elevated cutoff
    pub const ELEVATED: Tier = Tier(1);
    /// At or above the critical cutoff
    pub const CRITICAL: Tier = Tier(2);

    /// Create a banded policy, validating cutoff ordering and margin
    pub fn new(elevated: f64, critical: f64, margin: f64) -> Result<Self, PolicyError> {
        let cutoffs_ok = elevated.is_finite()
            && critical.is_finite()
            && elevated > 0.0
            && elevated < critical
            && critical <= 1.0;
        if !cutoffs_ok {
            return Err(PolicyError::InvalidCutoffs { elevated, critical });
        }
        if !margin.is_finite() || margin < 0.0 || margin >= elevated {
            return Err(PolicyError::InvalidMargin { margin, elevated });
        }

        Ok(Self {
            elevated,
            critical,
            margin,
        })
    }

    /// Lower bound of `tier`, if it is a banded tier
    pub fn boundary(&self, tier: Tier) -> Option<f64> {
        match tier {
            Self::ELEVATED => Some(self.elevated),
            Self::CRITICAL => Some(self.critical),
            _ => None,
        }
    }

    pub fn elevated(&self) -> f64 {
        self.elevated
    }

    pub fn critical(&self) -> f64 {
        self.critical
    }
}

impl Default for BandedPolicy {
    fn default() -> Self {
        Self {
            elevated: 0.65,
            critical: 0.99,
            margin: 0.10,
        }
    }
}

impl ThresholdPolicy for BandedPolicy {
    type Value = f64;

    fn classify(&self, value: f64) -> Tier {
        if value >= self.critical {
            Self::CRITICAL
        } else if value >= self.elevated {
            Self::ELEVATED
        } else {
            Self::NONE
        }
    }

    fn is_more_severe(&self, a: Tier, b: Tier) -> bool {
        a.0 > b.0
    }

    fn is_alerting(&self, tier: Tier) -> bool {
        tier != Self::NONE
    }

    fn hysteresis_margin(&self) -> f64 {
        self.margin
    }

    fn has_receded(&self, value: f64, recorded: Tier) -> bool {
        match self.boundary(recorded) {
            Some(boundary) => value < boundary - self.margin,
            None => true,
        }
    }

    fn in_watch_band(&self, value: f64) -> bool {
        value > self.elevated && value < self.critical
    }
}

/// Ordinal severity levels where a lower number is worse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalPolicy {
    ceiling: u8,
    baseline: u8,
}

impl OrdinalPolicy {
    /// Most severe level on the scale
    pub const MIN_LEVEL: u8 = 1;
    /// Least severe level on the scale
    pub const MAX_LEVEL: u8 = 5;

    /// Create an ordinal policy.
    ///
    /// `ceiling` is the least severe level that may notify; `baseline` is the
    /// level assumed before anything has been observed.
    pub fn new(ceiling: u8, baseline: u8) -> Result<Self, PolicyError> {
        for (field, level) in [("ceiling", ceiling), ("baseline", baseline)] {
            if !(Self::MIN_LEVEL..=Self::MAX_LEVEL).contains(&level) {
                return Err(PolicyError::LevelOutOfRange {
                    field,
                    level,
                    min: Self::MIN_LEVEL,
                    max: Self::MAX_LEVEL,
                });
            }
        }

        let policy = Self { ceiling, baseline };
        if !policy.is_more_severe(Tier(ceiling), Tier(baseline)) {
            return Err(PolicyError::CeilingNotMoreSevere { ceiling, baseline });
        }
        Ok(policy)
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    pub fn baseline(&self) -> u8 {
        self.baseline
    }
}

impl Default for OrdinalPolicy {
    fn default() -> Self {
        Self {
            ceiling: 4,
            baseline: 5,
        }
    }
}

impl ThresholdPolicy for OrdinalPolicy {
    type Value = u8;

    fn classify(&self, level: u8) -> Tier {
        Tier(level)
    }

    fn is_more_severe(&self, a: Tier, b: Tier) -> bool {
        a.0 < b.0
    }

    fn is_alerting(&self, tier: Tier) -> bool {
        tier.0 <= self.ceiling
    }

    fn has_receded(&self, level: u8, recorded: Tier) -> bool {
        self.is_more_severe(recorded, self.classify(level))
    }

    fn tracking(&self) -> Tracking {
        Tracking::LastObserved {
            baseline: Tier(self.baseline),
        }
    }
}

/// Boolean flag with no intermediate bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagPolicy;

impl FlagPolicy {
    pub const INACTIVE: Tier = Tier(0);
    pub const ACTIVE: Tier = Tier(1);
}

impl ThresholdPolicy for FlagPolicy {
    type Value = bool;

    fn classify(&self, active: bool) -> Tier {
        if active {
            Self::ACTIVE
        } else {
            Self::INACTIVE
        }
    }

    fn is_more_severe(&self, a: Tier, b: Tier) -> bool {
        a.0 > b.0
    }

    fn is_alerting(&self, tier: Tier) -> bool {
        tier == Self::ACTIVE
    }

    fn has_receded(&self, active: bool, _recorded: Tier) -> bool {
        !active
    }
}

/// What happens to tracked state when the global gate is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateClosed {
    /// Update state as usual, only withhold notifications
    #[default]
    Suppress,
    /// Discard all tracked state so the next open gate re-notifies everything
    Reset,
}

/// System-wide condition that must hold for a crossing to notify.
///
/// The indicator is an ordinal level where lower is worse (for example a
/// DEFCON-style scale); the gate is open while the level is at most `max_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalGate {
    max_level: u8,
    on_closed: GateClosed,
}

impl GlobalGate {
    /// Gate open while the global level is at most `max_level`
    pub fn at_most(max_level: u8) -> Self {
        Self {
            max_level,
            on_closed: GateClosed::Suppress,
        }
    }

    /// Set the closed-gate behavior
    pub fn on_closed(mut self, on_closed: GateClosed) -> Self {
        self.on_closed = on_closed;
        self
    }

    /// Whether notifications may be emitted for this global level.
    /// An unknown level keeps the gate closed.
    pub fn is_open(&self, level: Option<u8>) -> bool {
        level.map_or(false, |level| level <= self.max_level)
    }

    pub fn closed_behavior(&self) -> GateClosed {
        self.on_closed
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banded_classification() {
        let policy = BandedPolicy::default();

        assert_eq!(policy.classify(0.10), BandedPolicy::NONE);
        assert_eq!(policy.classify(0.6499), BandedPolicy::NONE);
        assert_eq!(policy.classify(0.65), BandedPolicy::ELEVATED);
        assert_eq!(policy.classify(0.98), BandedPolicy::ELEVATED);
        assert_eq!(policy.classify(0.99), BandedPolicy::CRITICAL);
        assert_eq!(policy.classify(1.0), BandedPolicy::CRITICAL);
        assert_eq!(policy.classify(f64::NAN), BandedPolicy::NONE);
    }

    #[test]
    fn test_banded_severity_is_ascending() {
        let policy = BandedPolicy::default();

        assert!(policy.is_more_severe(BandedPolicy::CRITICAL, BandedPolicy::ELEVATED));
        assert!(policy.is_more_severe(BandedPolicy::ELEVATED, BandedPolicy::NONE));
        assert!(!policy.is_more_severe(BandedPolicy::ELEVATED, BandedPolicy::CRITICAL));
        assert!(!policy.is_more_severe(BandedPolicy::ELEVATED, BandedPolicy::ELEVATED));
    }

    #[test]
    fn test_banded_recession_respects_margin() {
        let policy = BandedPolicy::default();

        // Elevated boundary 0.65, margin 0.10
        assert!(!policy.has_receded(0.60, BandedPolicy::ELEVATED));
        assert!(!policy.has_receded(0.56, BandedPolicy::ELEVATED));
        assert!(policy.has_receded(0.54, BandedPolicy::ELEVATED));

        // Critical boundary 0.99
        assert!(!policy.has_receded(0.90, BandedPolicy::CRITICAL));
        assert!(policy.has_receded(0.88, BandedPolicy::CRITICAL));
    }

    #[test]
    fn test_banded_watch_band_is_open_interval() {
        let policy = BandedPolicy::default();

        assert!(!policy.in_watch_band(0.50));
        assert!(!policy.in_watch_band(0.65));
        assert!(policy.in_watch_band(0.80));
        assert!(!policy.in_watch_band(0.99));
    }

    #[test]
    fn test_banded_rejects_bad_config() {
        assert!(matches!(
            BandedPolicy::new(0.99, 0.65, 0.1),
            Err(PolicyError::InvalidCutoffs { .. })
        ));
        assert!(matches!(
            BandedPolicy::new(0.5, 1.5, 0.1),
            Err(PolicyError::InvalidCutoffs { .. })
        ));
        assert!(matches!(
            BandedPolicy::new(0.65, 0.99, -0.1),
            Err(PolicyError::InvalidMargin { .. })
        ));
        assert!(matches!(
            BandedPolicy::new(0.65, 0.99, 0.7),
            Err(PolicyError::InvalidMargin { .. })
        ));
        assert!(BandedPolicy::new(0.65, 0.99, 0.10).is_ok());
    }

    #[test]
    fn test_ordinal_lower_level_is_more_severe() {
        let policy = OrdinalPolicy::default();

        assert!(policy.is_more_severe(Tier(3), Tier(4)));
        assert!(policy.is_more_severe(Tier(1), Tier(5)));
        assert!(!policy.is_more_severe(Tier(4), Tier(3)));
        assert!(!policy.is_more_severe(Tier(4), Tier(4)));
    }

    #[test]
    fn test_ordinal_ceiling() {
        let policy = OrdinalPolicy::default();

        assert!(policy.is_alerting(Tier(1)));
        assert!(policy.is_alerting(Tier(4)));
        assert!(!policy.is_alerting(Tier(5)));
        assert_eq!(
            policy.tracking(),
            Tracking::LastObserved { baseline: Tier(5) }
        );
    }

    #[test]
    fn test_ordinal_rejects_inverted_config() {
        assert_eq!(
            OrdinalPolicy::new(5, 4),
            Err(PolicyError::CeilingNotMoreSevere {
                ceiling: 5,
                baseline: 4
            })
        );
        assert_eq!(
            OrdinalPolicy::new(4, 4),
            Err(PolicyError::CeilingNotMoreSevere {
                ceiling: 4,
                baseline: 4
            })
        );
        assert!(matches!(
            OrdinalPolicy::new(0, 5),
            Err(PolicyError::LevelOutOfRange { field: "ceiling", .. })
        ));
        assert!(matches!(
            OrdinalPolicy::new(2, 9),
            Err(PolicyError::LevelOutOfRange { field: "baseline", .. })
        ));
    }

    #[test]
    fn test_flag_policy() {
        let policy = FlagPolicy;

        assert_eq!(policy.classify(true), FlagPolicy::ACTIVE);
        assert_eq!(policy.classify(false), FlagPolicy::INACTIVE);
        assert!(policy.is_more_severe(FlagPolicy::ACTIVE, FlagPolicy::INACTIVE));
        assert!(policy.has_receded(false, FlagPolicy::ACTIVE));
        assert!(!policy.has_receded(true, FlagPolicy::ACTIVE));
        assert_eq!(policy.hysteresis_margin(), 0.0);
    }

    #[test]
    fn test_global_gate() {
        let gate = GlobalGate::at_most(2);

        assert!(gate.is_open(Some(1)));
        assert!(gate.is_open(Some(2)));
        assert!(!gate.is_open(Some(3)));
        assert!(!gate.is_open(None));
        assert_eq!(gate.closed_behavior(), GateClosed::Suppress);
        assert_eq!(
            gate.on_closed(GateClosed::Reset).closed_behavior(),
            GateClosed::Reset
        );
    }
}
