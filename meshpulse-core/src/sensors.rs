//! Sensor identity and reading representation
//!
//! The engine is one parametrized state machine, not one code path per
//! sensor type: everything it needs to know about a physical sensor is
//! captured by a [`SensorDescriptor`] and the canonical integer [`Reading`]
//! the acquisition layer hands over.
//!
//! ## Canonical readings
//!
//! All readings are `i64` in the sensor's native unit. The two sensors a
//! mesh node typically carries:
//!
//! - **Ambient light**: non-negative integer, device-specific unit
//! - **Ambient temperature**: signed half-degree Celsius ("Temperature 8"
//!   encoding), domain [-64.0, +63.5] with the two extreme encodings
//!   reserved as out-of-range sentinels
//!
//! Widening both to `i64` lets one evaluator serve both and removes the
//! unsigned-underflow hazard when a down-delta is subtracted from a small
//! unsigned reading.

use core::fmt;

/// Canonical sensor reading in the sensor's native unit
pub type Reading = i64;

/// Stable per-sensor identifier
///
/// Doubles as the persistence key seed, so values must stay stable across
/// firmware versions for a given hardware layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorId(pub u8);

/// Identifier of the semantic quantity being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyId(pub u16);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Present ambient light level property
pub const PROP_AMBIENT_LIGHT_LEVEL: PropertyId = PropertyId(0x004E);

/// Present ambient temperature property
pub const PROP_AMBIENT_TEMPERATURE: PropertyId = PropertyId(0x004F);

/// Wire length of an ambient light level value (unsigned, 24-bit)
pub const AMBIENT_LIGHT_VALUE_LEN: u8 = 3;

/// Wire length of an ambient temperature value (signed, Temperature 8)
pub const AMBIENT_TEMPERATURE_VALUE_LEN: u8 = 1;

/// Static schema for one monitored sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescriptor {
    /// Stable identity, also keys the persisted cadence record
    pub id: SensorId,
    /// Semantic quantity this sensor reports
    pub property_id: PropertyId,
    /// Declared wire length of one value, in bytes (1..=8)
    pub value_len: u8,
    /// Whether values are sign-extended when decoded
    pub signed: bool,
}

impl SensorDescriptor {
    /// Descriptor for an ambient light sensor
    pub const fn ambient_light(id: SensorId) -> Self {
        Self {
            id,
            property_id: PROP_AMBIENT_LIGHT_LEVEL,
            value_len: AMBIENT_LIGHT_VALUE_LEN,
            signed: false,
        }
    }

    /// Descriptor for an ambient temperature sensor
    pub const fn ambient_temperature(id: SensorId) -> Self {
        Self {
            id,
            property_id: PROP_AMBIENT_TEMPERATURE,
            value_len: AMBIENT_TEMPERATURE_VALUE_LEN,
            signed: true,
        }
    }

    /// Decode a little-endian wire value of `self.value_len` bytes
    ///
    /// Returns `None` when `bytes` is shorter than the declared length or
    /// the declared length itself is out of range.
    pub fn decode_value(&self, bytes: &[u8]) -> Option<Reading> {
        let len = self.value_len as usize;
        if len == 0 || len > 8 || bytes.len() < len {
            return None;
        }

        let mut raw: u64 = 0;
        for (i, b) in bytes[..len].iter().enumerate() {
            raw |= (*b as u64) << (8 * i);
        }

        if self.signed && len < 8 {
            // Sign-extend from the top bit of the declared width
            let shift = 64 - 8 * len as u32;
            Some(((raw << shift) as i64) >> shift)
        } else {
            Some(raw as i64)
        }
    }
}

/// Below-range sentinel for the Temperature 8 encoding (0x80)
pub const TEMPERATURE8_UNDER_RANGE: i8 = i8::MIN;

/// Above-range sentinel for the Temperature 8 encoding (0x7F)
pub const TEMPERATURE8_OVER_RANGE: i8 = i8::MAX;

/// Lowest representable temperature, hundredths of a degree Celsius (-64.0)
pub const TEMPERATURE8_MIN_CENTI: i32 = -6400;

/// Exclusive upper temperature bound, hundredths of a degree Celsius (+63.5)
pub const TEMPERATURE8_MAX_CENTI: i32 = 6350;

/// Convert a temperature in 0.01 degC units to the half-degree Temperature 8
/// encoding, clamping to the reserved sentinel values at the extremes.
pub fn temperature8_from_centi(centi_celsius: i32) -> i8 {
    if centi_celsius < TEMPERATURE8_MIN_CENTI {
        TEMPERATURE8_UNDER_RANGE
    } else if centi_celsius >= TEMPERATURE8_MAX_CENTI {
        TEMPERATURE8_OVER_RANGE
    } else {
        (centi_celsius / 50) as i8
    }
}
