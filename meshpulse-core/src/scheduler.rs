//! Per-sensor publication scheduling
//!
//! [`PublicationScheduler`] owns one logical timer per registered sensor.
//! The host run loop asks [`PublicationScheduler::next_wake`] when to sleep
//! and calls [`PublicationScheduler::service`] on expiry; the scheduler then
//! reads the sensor, runs the policy evaluator, dispatches a publication if
//! warranted, and re-arms from the freshest parameters.
//!
//! ## Timer model
//!
//! Deadlines are data, not callbacks. Each slot is `Idle` or `Armed` with a
//! single absolute deadline; re-arming replaces any pending deadline, so at
//! most one timeout is ever outstanding per sensor and a timer can never
//! fire on stale configuration. `Armed -> Idle` happens only when the
//! sensor is fully disabled (no period, no triggers).
//!
//! ## Memory model
//!
//! Slots live in a fixed-capacity `FnvIndexMap`: registration can fail when
//! the table is full, but steady-state operation never allocates. Sensors
//! are fully independent — no state crosses slot boundaries.

use heapless::FnvIndexMap;

use crate::{
    cadence::CadenceConfig,
    errors::{CadenceError, CadenceResult},
    policy::{compute_next_timeout, evaluate, Decision, SensorState},
    sensors::{PropertyId, Reading, SensorDescriptor, SensorId},
    time::{elapsed_ms, TimeSource, Timestamp},
};

/// Maximum number of monitored sensors (power of two for the index map)
pub const MAX_SENSORS: usize = 4;

/// Provider of fresh sensor readings
///
/// Acquisition is an external collaborator: reads are assumed synchronous
/// and fast, and a failing driver is expected to report through its own
/// sentinel encoding (see [`crate::sensors::temperature8_from_centi`]).
pub trait SensorSource {
    /// Sample the sensor identified by `id`
    fn read(&mut self, id: SensorId) -> Reading;
}

/// Outbound publication sink, fire-and-forget
///
/// The engine awaits no acknowledgement; framing and transport are the
/// mesh stack's concern.
pub trait Dispatcher {
    /// Publish `value` for the given sensor and property
    fn publish(&mut self, id: SensorId, property_id: PropertyId, value: Reading);
}

/// Logical timer state for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not scheduled; nothing will fire until configuration arms it
    Idle,
    /// Will fire at the absolute deadline
    Armed {
        /// Monotonic expiry time
        deadline: Timestamp,
    },
}

/// One registered sensor: schema, policy, tracking state, and its timer
#[derive(Debug, Clone, Copy)]
struct SensorSlot {
    descriptor: SensorDescriptor,
    config: CadenceConfig,
    state: SensorState,
    timer: TimerState,
}

/// Owns the per-sensor cadence timers and drives the policy evaluator
pub struct PublicationScheduler<C: TimeSource> {
    clock: C,
    slots: FnvIndexMap<SensorId, SensorSlot, MAX_SENSORS>,
}

impl<C: TimeSource> PublicationScheduler<C> {
    /// Create a scheduler with no registered sensors
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            slots: FnvIndexMap::new(),
        }
    }

    /// Register a sensor and take its initial reading
    ///
    /// The initial value counts as published: the first period starts now.
    /// The timer arms immediately if the configuration calls for it.
    pub fn register<S: SensorSource>(
        &mut self,
        descriptor: SensorDescriptor,
        config: CadenceConfig,
        source: &mut S,
    ) -> CadenceResult<()> {
        config
            .validate()
            .map_err(|reason| CadenceError::InvalidConfig { reason })?;

        let now = self.clock.now();
        let initial = source.read(descriptor.id);
        let mut slot = SensorSlot {
            descriptor,
            config,
            state: SensorState::new(initial, now),
            timer: TimerState::Idle,
        };
        slot.timer = rearm(&mut slot.state, &slot.config, now);

        self.slots
            .insert(descriptor.id, slot)
            .map_err(|_| CadenceError::InvalidConfig {
                reason: "sensor table full",
            })?;
        Ok(())
    }

    /// Whether `id` has a registered slot
    pub fn contains(&self, id: SensorId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Identities of all registered sensors
    pub fn ids(&self) -> impl Iterator<Item = SensorId> + '_ {
        self.slots.keys().copied()
    }

    /// Cadence configuration for a sensor
    pub fn config(&self, id: SensorId) -> Option<&CadenceConfig> {
        self.slots.get(&id).map(|s| &s.config)
    }

    /// Tracking state for a sensor
    pub fn state(&self, id: SensorId) -> Option<&SensorState> {
        self.slots.get(&id).map(|s| &s.state)
    }

    /// Timer state for a sensor
    pub fn timer(&self, id: SensorId) -> Option<TimerState> {
        self.slots.get(&id).map(|s| s.timer)
    }

    /// Descriptor the sensor registered with
    pub fn descriptor(&self, id: SensorId) -> Option<&SensorDescriptor> {
        self.slots.get(&id).map(|s| &s.descriptor)
    }

    /// Replace a sensor's cadence configuration and re-arm its timer
    pub fn set_config(&mut self, id: SensorId, config: CadenceConfig) -> CadenceResult<()> {
        config
            .validate()
            .map_err(|reason| CadenceError::InvalidConfig { reason })?;

        let now = self.clock.now();
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(CadenceError::UnknownSensor(id))?;
        slot.config = config;
        slot.timer = rearm(&mut slot.state, &slot.config, now);
        Ok(())
    }

    /// Set a sensor's base publish period and re-arm its timer
    pub fn set_publish_period(&mut self, id: SensorId, period_ms: u32) -> CadenceResult<()> {
        let now = self.clock.now();
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(CadenceError::UnknownSensor(id))?;
        slot.state.publish_period_ms = period_ms;
        slot.timer = rearm(&mut slot.state, &slot.config, now);
        Ok(())
    }

    /// Re-arm a sensor's timer from its current parameters
    pub fn restart(&mut self, id: SensorId) -> CadenceResult<()> {
        let now = self.clock.now();
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(CadenceError::UnknownSensor(id))?;
        slot.timer = rearm(&mut slot.state, &slot.config, now);
        Ok(())
    }

    /// Earliest armed deadline across all sensors
    ///
    /// The host run loop sleeps until this instant, then calls
    /// [`Self::service`].
    pub fn next_wake(&self) -> Option<Timestamp> {
        self.slots
            .values()
            .filter_map(|slot| match slot.timer {
                TimerState::Armed { deadline } => Some(deadline),
                TimerState::Idle => None,
            })
            .min()
    }

    /// Fire every due sensor: read, evaluate, publish if warranted, re-arm
    ///
    /// Returns how many sensors published. Sensors are independent and may
    /// be serviced in any order.
    pub fn service<S: SensorSource, D: Dispatcher>(
        &mut self,
        source: &mut S,
        dispatcher: &mut D,
    ) -> usize {
        let now = self.clock.now();
        let mut published = 0;

        for (id, slot) in self.slots.iter_mut() {
            let due = matches!(slot.timer, TimerState::Armed { deadline } if deadline <= now);
            if !due {
                continue;
            }

            slot.state.current_value = source.read(*id);
            if fire(slot, now, dispatcher) {
                published += 1;
            }
        }

        published
    }

    /// Accept an externally reported value for a sensor
    ///
    /// The value replaces the current reading without touching the
    /// acquisition layer. If the min-interval floor has not elapsed the
    /// timer is armed for the remainder and the value rides along on the
    /// next wake; otherwise it is evaluated immediately.
    pub fn accept_external_value<D: Dispatcher>(
        &mut self,
        id: SensorId,
        value: Reading,
        dispatcher: &mut D,
    ) -> CadenceResult<()> {
        let now = self.clock.now();
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(CadenceError::UnknownSensor(id))?;

        slot.state.current_value = value;

        let elapsed = elapsed_ms(slot.state.last_sent_time, now);
        if elapsed < slot.config.min_interval_ms as u64 {
            slot.timer = TimerState::Armed {
                deadline: now + (slot.config.min_interval_ms as u64 - elapsed),
            };
            return Ok(());
        }

        fire(slot, now, dispatcher);
        Ok(())
    }
}

/// Evaluate one due slot and re-arm it; returns whether it published
fn fire<D: Dispatcher>(slot: &mut SensorSlot, now: Timestamp, dispatcher: &mut D) -> bool {
    match evaluate(&slot.state, &slot.config, now) {
        Decision::Deferred { retry_in_ms } => {
            // Floor not reached: retry at the remainder, parameters untouched
            slot.timer = TimerState::Armed {
                deadline: now + retry_in_ms as u64,
            };
            false
        }
        Decision::Publish => {
            slot.state.mark_published(now);
            dispatcher.publish(
                slot.descriptor.id,
                slot.descriptor.property_id,
                slot.state.last_sent_value,
            );
            slot.timer = rearm(&mut slot.state, &slot.config, now);
            true
        }
        Decision::Suppress => {
            slot.timer = rearm(&mut slot.state, &slot.config, now);
            false
        }
    }
}

/// Arm or idle a timer per the restart algorithm
fn rearm(state: &mut SensorState, config: &CadenceConfig, now: Timestamp) -> TimerState {
    match compute_next_timeout(state, config) {
        Some(timeout) => TimerState::Armed {
            deadline: now + timeout as u64,
        },
        None => TimerState::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::PROP_AMBIENT_LIGHT_LEVEL;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock handle the test keeps while the scheduler holds a clone
    #[derive(Clone, Default)]
    struct SharedClock(Rc<Cell<Timestamp>>);

    impl SharedClock {
        fn set(&self, t: Timestamp) {
            self.0.set(t);
        }
    }

    impl TimeSource for SharedClock {
        fn now(&self) -> Timestamp {
            self.0.get()
        }

        fn is_wall_clock(&self) -> bool {
            false
        }
    }

    struct ConstSource(Reading);

    impl SensorSource for ConstSource {
        fn read(&mut self, _id: SensorId) -> Reading {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        published: std::vec::Vec<(SensorId, PropertyId, Reading)>,
    }

    impl Dispatcher for RecordingDispatcher {
        fn publish(&mut self, id: SensorId, property_id: PropertyId, value: Reading) {
            self.published.push((id, property_id, value));
        }
    }

    fn light_descriptor() -> SensorDescriptor {
        SensorDescriptor::ambient_light(SensorId(0))
    }

    #[test]
    fn unconfigured_sensor_stays_idle() {
        let mut scheduler = PublicationScheduler::new(SharedClock::default());
        let mut source = ConstSource(300);

        scheduler
            .register(light_descriptor(), CadenceConfig::default(), &mut source)
            .unwrap();

        // Default config: no period, no triggers -> unscheduled
        assert_eq!(scheduler.timer(SensorId(0)), Some(TimerState::Idle));
        assert_eq!(scheduler.next_wake(), None);
    }

    #[test]
    fn period_set_arms_and_fires() {
        let clock = SharedClock::default();
        let mut scheduler = PublicationScheduler::new(clock.clone());
        let mut source = ConstSource(300);
        let mut dispatcher = RecordingDispatcher::default();

        scheduler
            .register(light_descriptor(), CadenceConfig::default(), &mut source)
            .unwrap();
        scheduler.set_publish_period(SensorId(0), 10_000).unwrap();
        assert_eq!(scheduler.next_wake(), Some(10_000));

        // Nothing due before the deadline
        clock.set(9_999);
        assert_eq!(scheduler.service(&mut source, &mut dispatcher), 0);
        assert!(dispatcher.published.is_empty());

        // Period elapsed: fires, publishes, re-arms for the next period
        clock.set(10_000);
        assert_eq!(scheduler.service(&mut source, &mut dispatcher), 1);
        assert_eq!(
            dispatcher.published,
            vec![(SensorId(0), PROP_AMBIENT_LIGHT_LEVEL, 300)]
        );
        assert_eq!(scheduler.next_wake(), Some(20_000));
        assert_eq!(scheduler.state(SensorId(0)).unwrap().last_sent_time, 10_000);
    }

    #[test]
    fn reconfiguration_replaces_pending_deadline() {
        let clock = SharedClock::default();
        let mut scheduler = PublicationScheduler::new(clock.clone());
        let mut source = ConstSource(300);

        scheduler
            .register(light_descriptor(), CadenceConfig::default(), &mut source)
            .unwrap();
        scheduler.set_publish_period(SensorId(0), 60_000).unwrap();
        assert_eq!(scheduler.next_wake(), Some(60_000));

        // A divisor change mid-flight cancels the stale deadline
        clock.set(5_000);
        let fast = CadenceConfig {
            fast_cadence_period_divisor: 4,
            ..CadenceConfig::default()
        };
        scheduler.set_config(SensorId(0), fast).unwrap();
        assert_eq!(scheduler.next_wake(), Some(5_000 + 15_000));
        assert_eq!(
            scheduler.state(SensorId(0)).unwrap().fast_publish_period_ms,
            15_000
        );
    }

    #[test]
    fn external_value_defers_inside_floor() {
        let mut scheduler = PublicationScheduler::new(SharedClock::default());
        let mut source = ConstSource(300);
        let mut dispatcher = RecordingDispatcher::default();

        scheduler
            .register(light_descriptor(), CadenceConfig::default(), &mut source)
            .unwrap();

        // Floor is the default 4096ms and no time has passed
        scheduler
            .accept_external_value(SensorId(0), 900, &mut dispatcher)
            .unwrap();
        assert!(dispatcher.published.is_empty());
        assert_eq!(
            scheduler.timer(SensorId(0)),
            Some(TimerState::Armed { deadline: 4_096 })
        );
        assert_eq!(scheduler.state(SensorId(0)).unwrap().current_value, 900);
    }

    #[test]
    fn rejects_unknown_sensor() {
        let mut scheduler = PublicationScheduler::new(SharedClock::default());
        assert_eq!(
            scheduler.set_publish_period(SensorId(9), 1_000),
            Err(CadenceError::UnknownSensor(SensorId(9)))
        );
    }
}
