//! # Input Router
//!
//! Turns raw keyboard and HID events into [`CommandRecord`]s.
//!
//! - Keyboard: a press emits `value = 1`. A release emits `value = 0` only for
//!   directional commands, so their latch can be cleared; everything else
//!   fires once on press.
//! - HID digital: edge-triggered. A value equal to the last one emitted for
//!   the same command is suppressed.
//! - HID analog: dead zone first, then lookup by `+name`/`-name` depending on
//!   the sign of the raw reading, then debounce against the last value
//!   emitted for that command.
//!
//! The debounce cache is keyed by logical command, not by physical component.

use tracing::trace;

use super::bindings::BindingTable;
use super::calibration::apply_dead_zone;
use crate::protocol::command::{CommandRecord, COMMAND_COUNT};

/// Analog changes of this size or smaller are not re-emitted.
pub const DEBOUNCE_DELTA: f32 = 0.03;

/// One HID reading, already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct HidSample {
    /// evdev component name, e.g. `ABS_X` or `BTN_SOUTH`
    pub component: String,
    /// `-1.0..=1.0` for analog components, `0.0`/`1.0` for digital ones
    pub value: f32,
    pub analog: bool,
}

/// Normalizes raw input into command records.
#[derive(Debug)]
pub struct InputRouter {
    bindings: BindingTable,
    last_values: [Option<f32>; COMMAND_COUNT],
}

impl InputRouter {
    #[must_use]
    pub fn new(bindings: BindingTable) -> Self {
        Self {
            bindings,
            last_values: [None; COMMAND_COUNT],
        }
    }

    #[must_use]
    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Publishes a new binding table and forgets all debounce history.
    pub fn set_bindings(&mut self, bindings: BindingTable) {
        self.bindings = bindings;
        self.last_values = [None; COMMAND_COUNT];
    }

    /// Routes a keyboard key press or release.
    ///
    /// # Examples
    ///
    /// ```
    /// use robo_remote::controller::bindings::BindingTable;
    /// use robo_remote::controller::router::InputRouter;
    /// use robo_remote::protocol::command::LogicalCommand;
    ///
    /// let mut router = InputRouter::new(BindingTable::with_defaults());
    /// let w = LogicalCommand::Forward.default_key();
    ///
    /// let press = router.route_key_event(w, true).unwrap();
    /// assert_eq!(press.value(), 1.0);
    ///
    /// let release = router.route_key_event(w, false).unwrap();
    /// assert_eq!(release.value(), 0.0);
    /// ```
    pub fn route_key_event(&mut self, code: u16, pressed: bool) -> Option<CommandRecord> {
        let command = self.bindings.command_for_key(code)?;

        if pressed {
            Some(CommandRecord::pressed(command))
        } else if command.is_directional() {
            Some(CommandRecord::released(command))
        } else {
            None
        }
    }

    /// Routes one HID reading.
    pub fn route_hid_event(
        &mut self,
        component: &str,
        raw_value: f32,
        analog: bool,
    ) -> Option<CommandRecord> {
        if analog {
            self.route_analog(component, raw_value)
        } else {
            self.route_digital(component, raw_value)
        }
    }

    /// Convenience wrapper around [`InputRouter::route_hid_event`].
    pub fn route_hid_sample(&mut self, sample: &HidSample) -> Option<CommandRecord> {
        self.route_hid_event(&sample.component, sample.value, sample.analog)
    }

    fn route_analog(&mut self, component: &str, raw_value: f32) -> Option<CommandRecord> {
        let sign = if raw_value > 0.0 { '+' } else { '-' };
        let value = apply_dead_zone(raw_value).abs().min(1.0);

        let id = format!("{}{}", sign, component);
        let command = self.bindings.command_for_hid(&id)?;

        let slot = &mut self.last_values[command.index()];
        if let Some(last) = *slot {
            if (value - last).abs() <= DEBOUNCE_DELTA {
                trace!("Debounced {} ({:.3} ~ {:.3})", id, value, last);
                return None;
            }
        }

        *slot = Some(value);
        Some(CommandRecord::new(command, value))
    }

    fn route_digital(&mut self, component: &str, raw_value: f32) -> Option<CommandRecord> {
        let command = self.bindings.command_for_hid(component)?;
        let value = if raw_value != 0.0 { 1.0 } else { 0.0 };

        let slot = &mut self.last_values[command.index()];
        if *slot == Some(value) {
            return None;
        }

        *slot = Some(value);
        Some(CommandRecord::new(command, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::LogicalCommand;
    use evdev::Key;

    fn router_with_hid(bindings: &[(LogicalCommand, &str)]) -> InputRouter {
        let mut table = BindingTable::with_defaults();
        for (command, id) in bindings {
            table.set_hid(*command, Some(id.to_string()));
        }
        InputRouter::new(table)
    }

    // ==================== Keyboard ====================

    #[test]
    fn test_unbound_key_is_ignored() {
        let mut router = InputRouter::new(BindingTable::with_defaults());
        assert!(router.route_key_event(Key::KEY_Q.code(), true).is_none());
    }

    #[test]
    fn test_non_directional_key_fires_on_press_only() {
        let mut router = InputRouter::new(BindingTable::with_defaults());
        let z = Key::KEY_Z.code();

        let rec = router.route_key_event(z, true).unwrap();
        assert_eq!(rec.command(), LogicalCommand::LightsFront);
        assert_eq!(rec.value(), 1.0);

        assert!(router.route_key_event(z, false).is_none());
    }

    #[test]
    fn test_directional_key_release_emits_zero() {
        let mut router = InputRouter::new(BindingTable::with_defaults());
        let a = Key::KEY_A.code();

        assert_eq!(
            router.route_key_event(a, false),
            Some(CommandRecord::released(LogicalCommand::Left))
        );
    }

    #[test]
    fn test_keyboard_repeats_are_not_debounced() {
        let mut router = InputRouter::new(BindingTable::with_defaults());
        let one = Key::KEY_1.code();
        assert!(router.route_key_event(one, true).is_some());
        assert!(router.route_key_event(one, true).is_some());
    }

    // ==================== HID digital ====================

    #[test]
    fn test_digital_is_edge_triggered() {
        let mut router = router_with_hid(&[(LogicalCommand::ModeRc, "BTN_SOUTH")]);

        let first = router.route_hid_event("BTN_SOUTH", 1.0, false);
        assert_eq!(first, Some(CommandRecord::pressed(LogicalCommand::ModeRc)));
        assert!(router.route_hid_event("BTN_SOUTH", 1.0, false).is_none());

        let release = router.route_hid_event("BTN_SOUTH", 0.0, false);
        assert_eq!(release, Some(CommandRecord::released(LogicalCommand::ModeRc)));
        assert!(router.route_hid_event("BTN_SOUTH", 0.0, false).is_none());
    }

    #[test]
    fn test_unbound_hid_component_is_ignored() {
        let mut router = router_with_hid(&[]);
        assert!(router.route_hid_event("BTN_EAST", 1.0, false).is_none());
        assert!(router.route_hid_event("ABS_RZ", 0.8, true).is_none());
    }

    // ==================== HID analog ====================

    #[test]
    fn test_analog_sign_selects_binding() {
        let mut router = router_with_hid(&[
            (LogicalCommand::Forward, "-ABS_Y"),
            (LogicalCommand::Reverse, "+ABS_Y"),
        ]);

        let up = router.route_hid_event("ABS_Y", -0.8, true).unwrap();
        assert_eq!(up.command(), LogicalCommand::Forward);
        assert!((up.value() - 0.8).abs() < 1e-6);

        let down = router.route_hid_event("ABS_Y", 0.5, true).unwrap();
        assert_eq!(down.command(), LogicalCommand::Reverse);
        assert!((down.value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_analog_debounce() {
        let mut router = router_with_hid(&[(LogicalCommand::Right, "+ABS_X")]);

        assert!(router.route_hid_event("ABS_X", 0.50, true).is_some());
        assert!(router.route_hid_event("ABS_X", 0.52, true).is_none());
        assert!(router.route_hid_event("ABS_X", 0.48, true).is_none());

        let moved = router.route_hid_event("ABS_X", 0.60, true).unwrap();
        assert!((moved.value() - 0.60).abs() < 1e-6);
    }

    #[test]
    fn test_analog_debounce_tracks_last_emitted_value() {
        let mut router = router_with_hid(&[(LogicalCommand::Right, "+ABS_X")]);

        assert!(router.route_hid_event("ABS_X", 0.50, true).is_some());
        // small drift accumulates against the last emitted value, not the
        // last observed one
        assert!(router.route_hid_event("ABS_X", 0.52, true).is_none());
        assert!(router.route_hid_event("ABS_X", 0.54, true).is_some());
    }

    #[test]
    fn test_analog_dead_zone_returns_to_zero() {
        let mut router = router_with_hid(&[(LogicalCommand::Right, "+ABS_X")]);

        assert!(router.route_hid_event("ABS_X", 0.9, true).is_some());

        // stick released to just right of center: looked up as "+ABS_X"
        // and emitted as exactly zero
        let rec = router.route_hid_event("ABS_X", 0.01, true).unwrap();
        assert_eq!(rec.command(), LogicalCommand::Right);
        assert_eq!(rec.value(), 0.0);
    }

    #[test]
    fn test_analog_zero_uses_negative_half() {
        let mut router = router_with_hid(&[(LogicalCommand::Left, "-ABS_X")]);
        let rec = router.route_hid_event("ABS_X", 0.0, true).unwrap();
        assert_eq!(rec.command(), LogicalCommand::Left);
        assert_eq!(rec.value(), 0.0);
    }

    #[test]
    fn test_debounce_cache_is_per_command() {
        let mut router = router_with_hid(&[
            (LogicalCommand::Right, "+ABS_X"),
            (LogicalCommand::Reverse, "+ABS_Y"),
        ]);

        assert!(router.route_hid_event("ABS_X", 0.5, true).is_some());
        assert!(router.route_hid_event("ABS_Y", 0.5, true).is_some());
    }

    #[test]
    fn test_set_bindings_resets_debounce() {
        let mut router = router_with_hid(&[(LogicalCommand::Right, "+ABS_X")]);
        assert!(router.route_hid_event("ABS_X", 0.5, true).is_some());

        let table = router.bindings().clone();
        router.set_bindings(table);
        assert!(router.route_hid_event("ABS_X", 0.5, true).is_some());
    }

    #[test]
    fn test_route_hid_sample() {
        let mut router = router_with_hid(&[(LogicalCommand::LightsRear, "BTN_NORTH")]);
        let sample = HidSample {
            component: "BTN_NORTH".to_string(),
            value: 1.0,
            analog: false,
        };
        assert_eq!(
            router.route_hid_sample(&sample),
            Some(CommandRecord::pressed(LogicalCommand::LightsRear))
        );
    }
}
