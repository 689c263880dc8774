//! Publish/suppress decision logic
//!
//! [`evaluate`] is the pure per-wake decision function and
//! [`compute_next_timeout`] is the single restart algorithm. Both take the
//! sensor's state and cadence config explicitly — no clocks, no I/O — so
//! every rule here is testable with plain values.
//!
//! ## Rule order
//!
//! Evaluation applies a fixed order where earlier rules short-circuit later
//! ones:
//!
//! 1. min-interval floor (suppresses everything, returns the remainder)
//! 2. publish period elapsed
//! 3. delta trigger (native units or percent of current value)
//! 4. fast cadence window (tightened period + qualifying value region)
//!
//! The next timeout is *not* derived from the verdict: whatever rule 2-4
//! decided, the timer re-arms from [`compute_next_timeout`] on the freshest
//! parameters. Only the floor check (rule 1) carries its own explicit
//! retry time.

use crate::{
    cadence::CadenceConfig,
    sensors::Reading,
    time::{elapsed_ms, Timestamp},
};

/// Parts-per-10000 scale for percent-mode delta thresholds
const PERCENT_SCALE: i64 = 10_000;

/// Mutable per-sensor tracking of observed and published values
///
/// Created once per sensor at registration, mutated only by the
/// scheduler/evaluator pair, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorState {
    /// Latest sampled value
    pub current_value: Reading,
    /// Value last actually published
    pub last_sent_value: Reading,
    /// Monotonic timestamp of the last publish
    pub last_sent_time: Timestamp,
    /// Base publish interval in ms; 0 means trigger-driven only
    pub publish_period_ms: u32,
    /// Derived `publish_period / divisor` when the divisor is > 1, else 0.
    /// Recomputed by [`compute_next_timeout`]; never set independently.
    pub fast_publish_period_ms: u32,
}

impl SensorState {
    /// State for a freshly registered sensor: the initial reading counts as
    /// published so the first period starts now.
    pub fn new(initial_value: Reading, now: Timestamp) -> Self {
        Self {
            current_value: initial_value,
            last_sent_value: initial_value,
            last_sent_time: now,
            publish_period_ms: 0,
            fast_publish_period_ms: 0,
        }
    }

    /// Record an accepted publish verdict
    pub fn mark_published(&mut self, now: Timestamp) {
        self.last_sent_value = self.current_value;
        self.last_sent_time = now;
    }
}

/// Publish/no-publish verdict for one wake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The min-interval floor has not elapsed: suppress and re-check after
    /// `retry_in_ms`, skipping every other rule
    Deferred {
        /// Remaining floor time, `min_interval - elapsed`
        retry_in_ms: u32,
    },
    /// Publish the current value now
    Publish,
    /// Nothing to publish this wake
    Suppress,
}

/// Decide whether the sensor's current value should be published at `now`
pub fn evaluate(state: &SensorState, config: &CadenceConfig, now: Timestamp) -> Decision {
    let elapsed = elapsed_ms(state.last_sent_time, now);

    // Rule 1: hard floor between publications, independent of all triggers
    if elapsed < config.min_interval_ms as u64 {
        return Decision::Deferred {
            retry_in_ms: config.min_interval_ms - elapsed as u32,
        };
    }

    // Rule 2: base publish period elapsed
    if state.publish_period_ms != 0 && elapsed >= state.publish_period_ms as u64 {
        return Decision::Publish;
    }

    // Rule 3: value changed more than the configured deltas
    if config.has_delta_trigger() && delta_triggered(state, config) {
        return Decision::Publish;
    }

    // Rule 4: tightened cadence while the value is in the fast window
    if state.fast_publish_period_ms != 0
        && elapsed >= state.fast_publish_period_ms as u64
        && config.fast_window_qualifies(state.current_value)
    {
        return Decision::Publish;
    }

    Decision::Suppress
}

/// Delta-trigger check in the configured threshold mode
fn delta_triggered(state: &SensorState, config: &CadenceConfig) -> bool {
    let current = state.current_value;
    let sent = state.last_sent_value;

    match config.trigger_mode {
        crate::cadence::TriggerMode::Native => {
            (config.trigger_delta_up != 0 && current >= sent + config.trigger_delta_up as i64)
                || (config.trigger_delta_down != 0
                    && current <= sent - config.trigger_delta_down as i64)
        }
        crate::cadence::TriggerMode::Percent => {
            // The quotient is taken against the *current* reading. A zero
            // current makes the ratio undefined: skip the check this wake.
            if current == 0 {
                return false;
            }
            if config.trigger_delta_up != 0 && current > sent {
                let pct_up = (current - sent) * PERCENT_SCALE / current;
                if pct_up > config.trigger_delta_up as i64 {
                    return true;
                }
            }
            if config.trigger_delta_down != 0 && current < sent {
                let pct_down = (sent - current) * PERCENT_SCALE / current;
                if pct_down > config.trigger_delta_down as i64 {
                    return true;
                }
            }
            false
        }
    }
}

/// Single restart algorithm: next timer interval from the freshest
/// parameters, or `None` when the sensor should be left unscheduled
///
/// Also re-derives `state.fast_publish_period_ms`, which only ever changes
/// through here. Called from every mutation path: after each wake, after a
/// cadence or period change, and after an external value report.
pub fn compute_next_timeout(state: &mut SensorState, config: &CadenceConfig) -> Option<u32> {
    if state.publish_period_ms == 0 {
        state.fast_publish_period_ms = 0;
        // Not period-driven. A configured delta trigger still needs the
        // value polled at least every min_interval or a threshold crossing
        // could be missed entirely.
        if config.min_interval_ms != 0 && config.has_delta_trigger() {
            return Some(config.min_interval_ms);
        }
        return None;
    }

    let mut timeout = state.publish_period_ms;
    if config.fast_cadence_period_divisor > 1 {
        state.fast_publish_period_ms =
            state.publish_period_ms / config.fast_cadence_period_divisor as u32;
        timeout = state.fast_publish_period_ms;
    } else {
        state.fast_publish_period_ms = 0;
    }

    // Tighten (never loosen) so a delta crossing is seen within min_interval
    if config.has_delta_trigger() && config.min_interval_ms < timeout {
        timeout = config.min_interval_ms;
    }

    Some(timeout)
}
