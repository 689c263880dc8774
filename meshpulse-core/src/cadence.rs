//! Cadence configuration for one monitored sensor
//!
//! A [`CadenceConfig`] describes the operator-configured publish policy:
//! how often to check, what change is big enough to publish out of cycle,
//! and which value sub-range warrants a faster check cadence. It is
//! immutable between reconfiguration events and is the only part of the
//! engine that survives a reset (see [`crate::storage`]).
//!
//! ## Fast cadence window
//!
//! `fast_cadence_low`/`fast_cadence_high` define the qualifying region for
//! the tightened cadence:
//!
//! ```text
//! high >= low:   |----[ low ..... high ]----|   inside the range qualifies
//! high <  low:   | qualifies )( low ..... high )( qualifies |
//! ```
//!
//! The inverted form (high < low) qualifies values strictly *outside*
//! `[high, low]`, so a single pair of bounds expresses both "watch this
//! band closely" and "watch everything except this band".

use crate::sensors::Reading;

/// How the delta triggers interpret their thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TriggerMode {
    /// Thresholds are in the sensor's native unit
    #[default]
    Native = 0,
    /// Thresholds are parts-per-10000 (0.01%) of the current reading
    Percent = 1,
}

/// Default hard floor between publications: ~4 seconds
pub const DEFAULT_MIN_INTERVAL_MS: u32 = 1 << 12;

/// Publish policy parameters for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CadenceConfig {
    /// Divisor applied to the publish period while the fast window
    /// qualifies; 1 means the cadence never changes with the measurement
    pub fast_cadence_period_divisor: u16,
    /// Interpretation of the delta thresholds
    pub trigger_mode: TriggerMode,
    /// Upward change threshold; 0 disables the up trigger
    pub trigger_delta_up: u32,
    /// Downward change threshold; 0 disables the down trigger
    pub trigger_delta_down: u32,
    /// Hard floor between publications in milliseconds, independent of all
    /// other triggers
    pub min_interval_ms: u32,
    /// Lower bound of the fast cadence window (sensor units)
    pub fast_cadence_low: Reading,
    /// Upper bound of the fast cadence window (sensor units)
    pub fast_cadence_high: Reading,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            fast_cadence_period_divisor: 1,
            trigger_mode: TriggerMode::Native,
            trigger_delta_up: 0,
            trigger_delta_down: 0,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            fast_cadence_low: 0,
            fast_cadence_high: 0,
        }
    }
}

/// Encoded size of a cadence record in durable storage
pub const ENCODED_LEN: usize = 31;

impl CadenceConfig {
    /// Check that the restart algorithm can honor these parameters
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.fast_cadence_period_divisor == 0 {
            return Err("fast cadence period divisor must be >= 1");
        }
        Ok(())
    }

    /// At least one delta trigger direction is enabled
    pub fn has_delta_trigger(&self) -> bool {
        self.trigger_delta_up != 0 || self.trigger_delta_down != 0
    }

    /// Whether `value` falls in the qualifying region of the fast window
    ///
    /// Normal bounds qualify values inside `[low, high]`; inverted bounds
    /// (`high < low`) qualify values strictly outside `[high, low]`.
    pub fn fast_window_qualifies(&self, value: Reading) -> bool {
        if self.fast_cadence_high >= self.fast_cadence_low {
            value >= self.fast_cadence_low && value <= self.fast_cadence_high
        } else {
            value > self.fast_cadence_low || value < self.fast_cadence_high
        }
    }

    /// Encode as a fixed little-endian record for durable storage
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[0..2].copy_from_slice(&self.fast_cadence_period_divisor.to_le_bytes());
        out[2] = self.trigger_mode as u8;
        out[3..7].copy_from_slice(&self.trigger_delta_up.to_le_bytes());
        out[7..11].copy_from_slice(&self.trigger_delta_down.to_le_bytes());
        out[11..15].copy_from_slice(&self.min_interval_ms.to_le_bytes());
        out[15..23].copy_from_slice(&self.fast_cadence_low.to_le_bytes());
        out[23..31].copy_from_slice(&self.fast_cadence_high.to_le_bytes());
        out
    }

    /// Decode a durable record
    ///
    /// Returns `None` for wrong lengths, unknown trigger modes, or a zero
    /// divisor: a corrupt record must degrade to the default configuration,
    /// never panic.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ENCODED_LEN {
            return None;
        }

        let trigger_mode = match bytes[2] {
            0 => TriggerMode::Native,
            1 => TriggerMode::Percent,
            _ => return None,
        };

        let config = Self {
            fast_cadence_period_divisor: u16::from_le_bytes([bytes[0], bytes[1]]),
            trigger_mode,
            trigger_delta_up: u32::from_le_bytes(bytes[3..7].try_into().ok()?),
            trigger_delta_down: u32::from_le_bytes(bytes[7..11].try_into().ok()?),
            min_interval_ms: u32::from_le_bytes(bytes[11..15].try_into().ok()?),
            fast_cadence_low: i64::from_le_bytes(bytes[15..23].try_into().ok()?),
            fast_cadence_high: i64::from_le_bytes(bytes[23..31].try_into().ok()?),
        };

        config.validate().ok()?;
        Some(config)
    }
}
