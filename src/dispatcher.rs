//! # Command Dispatcher
//!
//! Applies routed [`CommandRecord`]s to the operator state and decides which
//! wire message, if any, each one produces.
//!
//! - Directional commands move the continuous speed/turn targets and, for
//!   discrete sources, the directional latches. They never emit a message
//!   of their own: the motion tick is the only source of motor commands.
//! - Mode commands select one of four exclusive modes and emit its token.
//! - Light and rescan commands emit their token with a `0`/`1` flag.
//!
//! Keyboard latches take priority: while any keyboard direction is held,
//! directional input from the HID controller has no effect on the targets.
//! The latest suppressed record per axis is kept and applied once the last
//! keyboard direction is released, so a stick or button that stayed put
//! is picked up again. A HID button release always clears its latch.

use tracing::debug;

use crate::controller::motion::{
    compute_motor_command, DirectionalLatchState, MotorCommand, TARGET_MAX,
};
use crate::protocol::command::{CommandRecord, Direction, Light, Mode};
use crate::protocol::encoder::encode_discrete_command;
use crate::session::ControlSurface;

/// Where a command record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Keyboard,
    HidDigital,
    HidAnalog,
    /// Issued by the UI or a timer rather than a physical device.
    Synthetic,
}

impl InputSource {
    #[must_use]
    pub fn is_hid(self) -> bool {
        matches!(self, InputSource::HidDigital | InputSource::HidAnalog)
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Speed = 0,
    Turn = 1,
}

impl Axis {
    fn of(direction: Direction) -> Axis {
        match direction {
            Direction::Forward | Direction::Reverse => Axis::Speed,
            Direction::Left | Direction::Right => Axis::Turn,
        }
    }
}

/// Operator state owned by the session.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    speed_target: i32,
    turn_target: i32,
    keyboard_latches: DirectionalLatchState,
    hid_latches: DirectionalLatchState,
    /// Suppressed HID records, indexed by [`Axis`].
    deferred: [Option<(CommandRecord, InputSource)>; 2],
    mode: Mode,
    lights: [bool; 3],
}

impl CommandDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one command record.
    ///
    /// Returns the wire message to send, without line terminator.
    ///
    /// # Examples
    ///
    /// ```
    /// use robo_remote::dispatcher::{CommandDispatcher, InputSource};
    /// use robo_remote::protocol::command::{CommandRecord, LogicalCommand};
    /// use robo_remote::session::NullSurface;
    ///
    /// let mut dispatcher = CommandDispatcher::new();
    /// let rec = CommandRecord::pressed(LogicalCommand::LightsFront);
    /// let line = dispatcher.on_command(rec, InputSource::Keyboard, &mut NullSurface);
    /// assert_eq!(line.as_deref(), Some("LF1"));
    /// ```
    pub fn on_command(
        &mut self,
        rec: CommandRecord,
        source: InputSource,
        surface: &mut dyn ControlSurface,
    ) -> Option<String> {
        let command = rec.command();

        if let Some(direction) = command.direction() {
            self.on_directional(direction, rec, source, surface);
            return None;
        }

        if let Some(mode) = command.mode() {
            if !rec.is_active() {
                return None;
            }
            self.mode = mode;
            surface.mode_selected(mode);
            return encode_discrete_command(command, None);
        }

        let on = rec.is_active();
        if let Some(light) = command.light() {
            self.lights[light.index()] = on;
            surface.light_changed(light, on);
        }
        encode_discrete_command(command, Some(on))
    }

    fn on_directional(
        &mut self,
        direction: Direction,
        rec: CommandRecord,
        source: InputSource,
        surface: &mut dyn ControlSurface,
    ) {
        if source.is_hid() && self.keyboard_latches.any() {
            debug!("Deferred {:?} from controller while keyboard steers", direction);
            if source == InputSource::HidDigital && !rec.is_active() {
                self.hid_latches.set(direction, false);
            }
            self.deferred[Axis::of(direction) as usize] = Some((rec, source));
            return;
        }

        self.apply_directional(direction, rec, source, surface);

        let from_keyboard = matches!(source, InputSource::Keyboard | InputSource::Synthetic);
        if from_keyboard && !self.keyboard_latches.any() {
            self.resume_deferred(surface);
        }
    }

    fn apply_directional(
        &mut self,
        direction: Direction,
        rec: CommandRecord,
        source: InputSource,
        surface: &mut dyn ControlSurface,
    ) {
        match source {
            InputSource::Keyboard | InputSource::Synthetic => {
                self.keyboard_latches.set(direction, rec.is_active());
            }
            InputSource::HidDigital => self.hid_latches.set(direction, rec.is_active()),
            InputSource::HidAnalog => {}
        }

        let magnitude = (rec.value().abs() * TARGET_MAX as f32).round() as i32;
        match direction {
            Direction::Forward => self.set_speed(magnitude, surface),
            Direction::Reverse => self.set_speed(-magnitude, surface),
            Direction::Left => self.set_turn(-magnitude, surface),
            Direction::Right => self.set_turn(magnitude, surface),
        }
    }

    /// Apply what the controller reported while the keyboard had priority.
    fn resume_deferred(&mut self, surface: &mut dyn ControlSurface) {
        let deferred = std::mem::take(&mut self.deferred);
        for (rec, source) in deferred.into_iter().flatten() {
            if let Some(direction) = rec.command().direction() {
                debug!("Resuming {:?} from controller", direction);
                self.apply_directional(direction, rec, source, surface);
            }
        }
    }

    fn set_speed(&mut self, target: i32, surface: &mut dyn ControlSurface) {
        let target = target.clamp(-TARGET_MAX, TARGET_MAX);
        if target != self.speed_target {
            self.speed_target = target;
            surface.speed_changed(target);
        }
    }

    fn set_turn(&mut self, target: i32, surface: &mut dyn ControlSurface) {
        let target = target.clamp(-TARGET_MAX, TARGET_MAX);
        if target != self.turn_target {
            self.turn_target = target;
            surface.turn_changed(target);
        }
    }

    /// Motor command for the current targets and latches.
    #[must_use]
    pub fn motor_command(&self) -> MotorCommand {
        compute_motor_command(self.speed_target, self.turn_target, self.latches())
    }

    /// Directions held by any discrete source.
    #[must_use]
    pub fn latches(&self) -> DirectionalLatchState {
        self.keyboard_latches.union(self.hid_latches)
    }

    #[must_use]
    pub fn speed_target(&self) -> i32 {
        self.speed_target
    }

    #[must_use]
    pub fn turn_target(&self) -> i32 {
        self.turn_target
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn light(&self, light: Light) -> bool {
        self.lights[light.index()]
    }

    /// Release every latch and center both targets.
    ///
    /// Used when the input devices go away, so a key held at that moment
    /// does not keep the robot driving.
    pub fn release_all(&mut self, surface: &mut dyn ControlSurface) {
        self.keyboard_latches = DirectionalLatchState::default();
        self.hid_latches = DirectionalLatchState::default();
        self.deferred = [None; 2];
        self.set_speed(0, surface);
        self.set_turn(0, surface);
    }
}
