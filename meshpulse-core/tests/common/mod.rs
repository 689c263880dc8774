//! Shared test doubles for driving the engine over virtual time
//!
//! The engine owns no real timer: it exposes deadlines and the host calls
//! back on expiry. These helpers play the host: a shared virtual clock, a
//! scriptable sensor source, a dispatcher that records every publication
//! with its timestamp, and a run loop that jumps the clock from deadline
//! to deadline.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use meshpulse_core::{
    Dispatcher, PropertyId, Reading, SensorId, SensorServer, SensorSource, TimeSource, Timestamp,
};
use meshpulse_core::storage::PersistentStore;

/// Virtual clock; the test keeps one handle, the server a clone
#[derive(Clone, Default)]
pub struct SharedClock(Rc<Cell<Timestamp>>);

impl SharedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, t: Timestamp) {
        self.0.set(t);
    }

    pub fn now(&self) -> Timestamp {
        self.0.get()
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

/// Sensor source whose readings the test scripts per sensor
#[derive(Default)]
pub struct ScriptedSource {
    values: HashMap<SensorId, Reading>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: SensorId, value: Reading) {
        self.values.insert(id, value);
    }
}

impl SensorSource for ScriptedSource {
    fn read(&mut self, id: SensorId) -> Reading {
        *self.values.get(&id).unwrap_or(&0)
    }
}

/// Records every publication together with the virtual time it happened
pub struct RecordingDispatcher {
    clock: SharedClock,
    pub published: Vec<(Timestamp, SensorId, PropertyId, Reading)>,
}

impl RecordingDispatcher {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            published: Vec::new(),
        }
    }

    /// Publications for one sensor as (time, value) pairs
    pub fn for_sensor(&self, id: SensorId) -> Vec<(Timestamp, Reading)> {
        self.published
            .iter()
            .filter(|(_, sid, _, _)| *sid == id)
            .map(|(t, _, _, v)| (*t, *v))
            .collect()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn publish(&mut self, id: SensorId, property_id: PropertyId, value: Reading) {
        self.published
            .push((self.clock.now(), id, property_id, value));
    }
}

/// Jump the clock from deadline to deadline until `t_end`
///
/// Mirrors a host run loop that sleeps until the engine's next wake. The
/// clock lands exactly on each deadline, so timing assertions are exact.
pub fn run_until<P: PersistentStore>(
    server: &mut SensorServer<SharedClock, P>,
    clock: &SharedClock,
    source: &mut ScriptedSource,
    dispatcher: &mut RecordingDispatcher,
    t_end: Timestamp,
) {
    while let Some(deadline) = server.next_wake() {
        if deadline > t_end {
            break;
        }
        clock.set(deadline);
        server.service(source, dispatcher);
    }
    clock.set(t_end);
}

/// Store wrapper that can be made to fail writes, for degraded-mode tests
pub struct FlakyStore<P: PersistentStore> {
    inner: P,
    pub fail_saves: Rc<Cell<bool>>,
    pub save_attempts: Rc<RefCell<Vec<u16>>>,
}

impl<P: PersistentStore> FlakyStore<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            fail_saves: Rc::new(Cell::new(false)),
            save_attempts: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<P: PersistentStore> PersistentStore for FlakyStore<P> {
    fn load(
        &mut self,
        key: meshpulse_core::storage::StoreKey,
        buf: &mut [u8],
    ) -> Result<Option<usize>, meshpulse_core::StorageError> {
        self.inner.load(key, buf)
    }

    fn save(
        &mut self,
        key: meshpulse_core::storage::StoreKey,
        data: &[u8],
    ) -> Result<usize, meshpulse_core::StorageError> {
        self.save_attempts.borrow_mut().push(key.0);
        if self.fail_saves.get() {
            return Err(meshpulse_core::StorageError::WriteFailed);
        }
        self.inner.save(key, data)
    }

    fn delete(
        &mut self,
        key: meshpulse_core::storage::StoreKey,
    ) -> Result<(), meshpulse_core::StorageError> {
        self.inner.delete(key)
    }
}
