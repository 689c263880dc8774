//! Sensor server: inbound configuration and status events
//!
//! [`SensorServer`] ties the scheduler to durable storage and exposes the
//! entry points the mesh stack calls when a client reconfigures the node:
//! cadence set, publish period set, setting set, status override, and
//! factory reset. Each handler validates, applies, persists where required,
//! and re-arms the affected sensor — synchronously, run-to-completion, so
//! the surrounding run loop needs no locking.

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
}

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
}

use crate::{
    cadence::CadenceConfig,
    errors::{CadenceError, CadenceResult},
    scheduler::{Dispatcher, PublicationScheduler, SensorSource},
    sensors::{PropertyId, SensorDescriptor, SensorId},
    storage::{CadenceStore, PersistentStore},
    time::{TimeSource, Timestamp},
};

/// Company id of the standards body defining the sensor server model
pub const COMPANY_ID_SIG: u16 = 0xFFFF;

/// Model id of the sensor server this node exposes
pub const MODEL_ID_SENSOR_SERVER: u16 = 0x1100;

/// Status payload framing: property id + declared value length
const STATUS_HEADER_LEN: usize = 4;

/// The cadence engine's inbound face: scheduler plus persistence
pub struct SensorServer<C: TimeSource, P: PersistentStore> {
    scheduler: PublicationScheduler<C>,
    store: CadenceStore<P>,
}

impl<C: TimeSource, P: PersistentStore> SensorServer<C, P> {
    /// Create a server over an injected clock and platform store
    pub fn new(clock: C, store: P) -> Self {
        Self {
            scheduler: PublicationScheduler::new(clock),
            store: CadenceStore::new(store),
        }
    }

    /// Register a sensor, restoring its persisted cadence if present
    ///
    /// A missing, unreadable, or corrupt record falls back to the
    /// compiled-in default configuration.
    pub fn register_sensor<S: SensorSource>(
        &mut self,
        descriptor: SensorDescriptor,
        source: &mut S,
    ) -> CadenceResult<()> {
        let config = match self.store.load(descriptor.id) {
            Ok(Some(config)) => config,
            Ok(None) => CadenceConfig::default(),
            Err(e) => {
                log_warn!(
                    "cadence restore failed for sensor {}: {}, using defaults",
                    descriptor.id.0,
                    e
                );
                CadenceConfig::default()
            }
        };

        self.scheduler.register(descriptor, config, source)
    }

    /// Cadence-set event: replace, persist, re-arm
    ///
    /// Persistence failure is reported in the log only; the new in-memory
    /// configuration stays authoritative for the session.
    pub fn on_cadence_set(&mut self, id: SensorId, config: CadenceConfig) -> CadenceResult<()> {
        self.scheduler.set_config(id, config)?;

        match self.store.save(id, &config) {
            Ok(written) => {
                log_debug!("cadence for sensor {} persisted, {} bytes", id.0, written)
            }
            Err(e) => log_warn!("cadence save failed for sensor {}: {}", id.0, e),
        }
        Ok(())
    }

    /// Publish-period-set event
    ///
    /// The request must target a registered sensor and this node's sensor
    /// server model; anything else is rejected without side effects.
    pub fn on_publish_period_set(
        &mut self,
        id: SensorId,
        company_id: u16,
        model_id: u16,
        period_ms: u32,
    ) -> CadenceResult<()> {
        if !self.scheduler.contains(id) {
            return Err(CadenceError::UnknownSensor(id));
        }
        if company_id != COMPANY_ID_SIG || model_id != MODEL_ID_SENSOR_SERVER {
            return Err(CadenceError::ModelMismatch {
                company_id,
                model_id,
            });
        }

        log_debug!("sensor {} publish period set to {} ms", id.0, period_ms);
        self.scheduler.set_publish_period(id, period_ms)
    }

    /// Setting-set event: accounting hook only, no cadence recomputation
    pub fn on_setting_changed(&mut self, id: SensorId, setting_property_id: PropertyId) {
        log_debug!(
            "sensor {} setting {} changed",
            id.0,
            setting_property_id.0
        );
    }

    /// Status-override event: an external source reports a value on this
    /// node's behalf
    ///
    /// Payload is `[property_id: u16 LE][value_len: u16 LE][value bytes..]`.
    /// The property id and declared length must match the sensor's schema;
    /// malformed input is dropped without side effects.
    pub fn report_external_value<D: Dispatcher>(
        &mut self,
        id: SensorId,
        payload: &[u8],
        dispatcher: &mut D,
    ) -> CadenceResult<()> {
        let descriptor = *self
            .scheduler
            .descriptor(id)
            .ok_or(CadenceError::UnknownSensor(id))?;

        if payload.len() < STATUS_HEADER_LEN {
            return Err(CadenceError::MalformedStatus {
                reason: "payload shorter than header",
            });
        }

        let property_id = u16::from_le_bytes([payload[0], payload[1]]);
        let declared_len = u16::from_le_bytes([payload[2], payload[3]]);

        if property_id != descriptor.property_id.0 {
            return Err(CadenceError::MalformedStatus {
                reason: "property id does not match sensor schema",
            });
        }
        if declared_len != descriptor.value_len as u16 {
            return Err(CadenceError::MalformedStatus {
                reason: "declared value length does not match sensor schema",
            });
        }

        let value = descriptor
            .decode_value(&payload[STATUS_HEADER_LEN..])
            .ok_or(CadenceError::MalformedStatus {
                reason: "payload shorter than declared value length",
            })?;

        log_debug!("sensor {} external value {}", id.0, value);
        self.scheduler.accept_external_value(id, value, dispatcher)
    }

    /// Factory reset: clear the persisted cadence of every registered sensor
    ///
    /// Delete failures are logged and skipped; in-memory state is the
    /// mesh stack's to tear down.
    pub fn factory_reset(&mut self) {
        let ids: heapless::Vec<SensorId, { crate::scheduler::MAX_SENSORS }> =
            self.scheduler.ids().collect();
        for id in ids {
            if let Err(e) = self.store.delete(id) {
                log_warn!("factory reset: delete failed for sensor {}: {}", id.0, e);
            }
        }
    }

    /// Fire every due sensor (see [`PublicationScheduler::service`])
    pub fn service<S: SensorSource, D: Dispatcher>(
        &mut self,
        source: &mut S,
        dispatcher: &mut D,
    ) -> usize {
        self.scheduler.service(source, dispatcher)
    }

    /// Earliest pending deadline across all sensors
    pub fn next_wake(&self) -> Option<Timestamp> {
        self.scheduler.next_wake()
    }

    /// Direct access to the scheduler (state inspection, host integration)
    pub fn scheduler(&self) -> &PublicationScheduler<C> {
        &self.scheduler
    }
}
