//! Error types for cadence configuration and persistence failures
//!
//! Nothing in the cadence engine is fatal: every error here degrades to
//! "keep the current in-memory state and keep scheduling". Errors are kept
//! small (`Copy`, no heap, `&'static str` reasons only) because they cross
//! the config-change entry points on every inbound protocol event.
//!
//! ## Error Categories
//!
//! ### Request rejection (caller informed, no state change)
//! - `UnknownSensor`: request targets a sensor id that was never registered
//! - `ModelMismatch`: period-set request carries the wrong model/company pair
//! - `MalformedStatus`: inbound status payload fails schema validation
//! - `InvalidConfig`: cadence parameters the restart algorithm cannot honor
//!
//! ### Degraded operation (logged, in-memory state stays authoritative)
//! - `StorageError`: durable load/save/delete failed; the session continues
//!   on the compiled-in default or the last accepted configuration

use crate::sensors::SensorId;
use thiserror_no_std::Error;

/// Result type for cadence operations
pub type CadenceResult<T> = Result<T, CadenceError>;

/// Errors raised by the cadence engine's inbound entry points
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceError {
    /// Request targets a sensor id with no registered slot
    #[error("unknown sensor id {0:?}")]
    UnknownSensor(SensorId),

    /// Period-set request does not target this node's sensor server model
    #[error("model mismatch: company {company_id:#06x} model {model_id:#06x}")]
    ModelMismatch {
        /// Company id carried by the request
        company_id: u16,
        /// Model id carried by the request
        model_id: u16,
    },

    /// Inbound status payload failed length or property-id validation
    #[error("malformed status payload: {reason}")]
    MalformedStatus {
        /// Which validation the payload failed
        reason: &'static str,
    },

    /// Cadence parameters outside the representable range
    #[error("invalid cadence config: {reason}")]
    InvalidConfig {
        /// Which parameter the restart algorithm cannot honor
        reason: &'static str,
    },

    /// Durable storage failed; in-memory configuration remains authoritative
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the persistent key-value store seam
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Backing store could not read the record
    #[error("read failed")]
    ReadFailed,

    /// Backing store could not write the record
    #[error("write failed")]
    WriteFailed,

    /// Backing store could not delete the record
    #[error("delete failed")]
    DeleteFailed,

    /// Record exists but does not decode as a cadence configuration
    #[error("record corrupt")]
    Corrupt,

    /// Store capacity exhausted
    #[error("store full")]
    Full,
}

#[cfg(feature = "defmt")]
impl defmt::Format for CadenceError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::UnknownSensor(id) => defmt::write!(fmt, "unknown sensor {}", id.0),
            Self::ModelMismatch { company_id, model_id } => {
                defmt::write!(fmt, "model mismatch: company {:#06x} model {:#06x}", company_id, model_id)
            }
            Self::MalformedStatus { reason } => defmt::write!(fmt, "malformed status: {}", reason),
            Self::InvalidConfig { reason } => defmt::write!(fmt, "invalid config: {}", reason),
            Self::Storage(e) => defmt::write!(fmt, "storage: {}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StorageError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ReadFailed => defmt::write!(fmt, "read failed"),
            Self::WriteFailed => defmt::write!(fmt, "write failed"),
            Self::DeleteFailed => defmt::write!(fmt, "delete failed"),
            Self::Corrupt => defmt::write!(fmt, "record corrupt"),
            Self::Full => defmt::write!(fmt, "store full"),
        }
    }
}
