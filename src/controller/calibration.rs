//! # Calibration Module
//!
//! Normalizes raw absolute-axis readings and applies the analog dead zone.
//!
//! ## Normalization
//!
//! evdev reports each axis in the device's own `[minimum, maximum]` range.
//! Readings are mapped linearly onto `-1.0..=1.0`, so the center of the
//! range becomes `0.0`.
//!
//! ## Dead Zone
//!
//! Any normalized value whose magnitude is below [`ANALOG_DEAD_ZONE`] is
//! coerced to exactly `0.0`. Unlike a rescaling dead zone, values outside the
//! zone pass through unchanged.
//!
//! ```
//! use robo_remote::controller::calibration::{apply_dead_zone, AxisCalibration};
//!
//! let cal = AxisCalibration::new(0, 255);
//! assert_eq!(apply_dead_zone(cal.normalize(128)), 0.0);
//! assert_eq!(cal.normalize(255), 1.0);
//! ```

/// Analog readings closer to zero than this are treated as zero.
pub const ANALOG_DEAD_ZONE: f32 = 0.03;

/// Coerce values inside the dead zone to exactly zero.
#[inline]
#[must_use]
pub fn apply_dead_zone(value: f32) -> f32 {
    if value.abs() < ANALOG_DEAD_ZONE {
        0.0
    } else {
        value
    }
}

/// Reported range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCalibration {
    minimum: i32,
    maximum: i32,
}

impl Default for AxisCalibration {
    /// The 8-bit range most gamepads report when absinfo is unavailable.
    fn default() -> Self {
        Self {
            minimum: 0,
            maximum: 255,
        }
    }
}

impl AxisCalibration {
    #[must_use]
    pub fn new(minimum: i32, maximum: i32) -> Self {
        Self { minimum, maximum }
    }

    #[must_use]
    pub fn minimum(&self) -> i32 {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> i32 {
        self.maximum
    }

    /// Map a raw reading onto `-1.0..=1.0`.
    ///
    /// Readings outside the reported range are clamped. A degenerate range
    /// (`maximum <= minimum`) always yields `0.0`.
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f32 {
        if self.maximum <= self.minimum {
            return 0.0;
        }
        let span = (self.maximum as f64) - (self.minimum as f64);
        let offset = (raw as f64) - (self.minimum as f64);
        let unit = (offset / span).clamp(0.0, 1.0);
        (unit * 2.0 - 1.0) as f32
    }
}
