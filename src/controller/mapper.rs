//! # Input Event Mapper Module
//!
//! Converts raw evdev events into the router's input vocabulary.
//!
//! ## Event Types
//!
//! - **EV_KEY** on a keyboard: key press (`1`), release (`0`) or autorepeat
//!   (`2`, ignored).
//! - **EV_KEY** on a controller: a digital component named after the evdev
//!   key, e.g. `BTN_SOUTH`, value `0` or `1`.
//! - **EV_ABS** on a controller: an analog component named after the evdev
//!   axis, e.g. `ABS_X`, normalized to `-1.0..=1.0` with the axis range the
//!   device reported.
//!
//! Sync and other event types are dropped.

use std::collections::HashMap;

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};

use super::calibration::AxisCalibration;
use super::router::HidSample;

/// evdev key value for an autorepeat event.
const KEY_REPEAT: i32 = 2;

/// A keyboard key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    pub code: u16,
    pub pressed: bool,
}

/// Map a keyboard event to a key transition. Autorepeat is dropped.
#[must_use]
pub fn map_keyboard_event(event: &InputEvent) -> Option<KeyTransition> {
    match event.kind() {
        InputEventKind::Key(key) => match event.value() {
            0 => Some(KeyTransition { code: key.code(), pressed: false }),
            KEY_REPEAT => None,
            _ => Some(KeyTransition { code: key.code(), pressed: true }),
        },
        _ => None,
    }
}

/// Maps controller events to [`HidSample`]s using per-axis calibration.
#[derive(Debug, Clone, Default)]
pub struct EventMapper {
    axes: HashMap<u16, AxisCalibration>,
}

impl EventMapper {
    /// Creates a mapper that assumes the 8-bit default range on every axis.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper with the ranges reported by the device.
    #[must_use]
    pub fn with_calibrations(axes: HashMap<u16, AxisCalibration>) -> Self {
        Self { axes }
    }

    #[must_use]
    pub fn calibration(&self, axis: AbsoluteAxisType) -> AxisCalibration {
        self.axes.get(&axis.0).copied().unwrap_or_default()
    }

    /// Map one controller event.
    #[must_use]
    pub fn map_controller_event(&self, event: &InputEvent) -> Option<HidSample> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => Some(HidSample {
                component: axis_name(axis),
                value: self.calibration(axis).normalize(event.value()),
                analog: true,
            }),
            InputEventKind::Key(key) => {
                if event.value() == KEY_REPEAT {
                    return None;
                }
                Some(HidSample {
                    component: key_name(key),
                    value: if event.value() != 0 { 1.0 } else { 0.0 },
                    analog: false,
                })
            }
            _ => None,
        }
    }
}

/// evdev name of an axis, used as the HID component id.
#[must_use]
pub fn axis_name(axis: AbsoluteAxisType) -> String {
    format!("{:?}", axis)
}

/// evdev name of a key or button, used as the HID component id.
#[must_use]
pub fn key_name(key: Key) -> String {
    format!("{:?}", key)
}
