//! Publication cadence engine for meshpulse
//!
//! A node in a low-power sensing mesh samples its sensors and must decide,
//! wake after wake, whether the latest value is worth the radio time. This
//! crate is that decision: per-sensor logic reconciling a fixed publish
//! period, change-triggered deltas, and a fast-cadence sub-window into one
//! next-wake-time and one publish/no-publish verdict, with the operator's
//! cadence settings persisted across resets.
//!
//! Key constraints:
//! - No heap allocation in the engine (heapless fixed-capacity tables)
//! - Single-threaded, run-to-completion event handling; no locking
//! - Injected clock, sensor, transport, and storage seams so the engine is
//!   fully testable off-device
//!
//! ```no_run
//! use meshpulse_core::{
//!     CadenceConfig, MonotonicClock, SensorDescriptor, SensorId, SensorServer,
//! };
//! use meshpulse_core::storage::MemoryStore;
//! # struct Adc; struct Radio;
//! # impl meshpulse_core::SensorSource for Adc {
//! #     fn read(&mut self, _: SensorId) -> meshpulse_core::Reading { 0 }
//! # }
//! # impl meshpulse_core::Dispatcher for Radio {
//! #     fn publish(&mut self, _: SensorId, _: meshpulse_core::PropertyId,
//! #                _: meshpulse_core::Reading) {}
//! # }
//!
//! let mut server = SensorServer::new(MonotonicClock::new(), MemoryStore::new());
//! let mut adc = Adc;
//! let mut radio = Radio;
//!
//! server.register_sensor(SensorDescriptor::ambient_light(SensorId(0)), &mut adc)?;
//! server.register_sensor(SensorDescriptor::ambient_temperature(SensorId(1)), &mut adc)?;
//!
//! // Host run loop: sleep until the next deadline, then service
//! while let Some(_deadline) = server.next_wake() {
//!     // platform_sleep_until(deadline);
//!     server.service(&mut adc, &mut radio);
//! }
//! # Ok::<(), meshpulse_core::CadenceError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cadence;
pub mod errors;
pub mod policy;
pub mod scheduler;
pub mod sensors;
pub mod server;
pub mod storage;
pub mod time;

// Public API
pub use cadence::{CadenceConfig, TriggerMode, DEFAULT_MIN_INTERVAL_MS};
pub use errors::{CadenceError, CadenceResult, StorageError};
pub use policy::{compute_next_timeout, evaluate, Decision, SensorState};
pub use scheduler::{Dispatcher, PublicationScheduler, SensorSource, TimerState};
pub use sensors::{PropertyId, Reading, SensorDescriptor, SensorId};
pub use server::{SensorServer, COMPANY_ID_SIG, MODEL_ID_SENSOR_SERVER};
pub use storage::PersistentStore;
pub use time::{FixedClock, TimeSource, Timestamp};

#[cfg(feature = "std")]
pub use time::MonotonicClock;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
