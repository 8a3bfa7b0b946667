//! # Logical Commands
//!
//! The fixed set of operator commands, with their display titles, default
//! key bindings and wire tokens.

use evdev::Key;
use serde::Deserialize;

/// Number of logical commands.
pub const COMMAND_COUNT: usize = 12;

/// An operator command, independent of the input source that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalCommand {
    Forward,
    Reverse,
    Left,
    Right,
    LightsFront,
    LightsRear,
    LightsSides,
    ModeIdle,
    ModeAi,
    ModeScenario,
    ModeRc,
    RescanDistances,
}

/// Robot operating mode. Exactly one is selected at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Ai,
    Scenario,
    Rc,
}

/// Light groups on the robot body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    Front,
    Rear,
    Sides,
}

/// One of the four directional controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    Left,
    Right,
}

impl LogicalCommand {
    /// All commands in declaration order.
    pub const ALL: [LogicalCommand; COMMAND_COUNT] = [
        LogicalCommand::Forward,
        LogicalCommand::Reverse,
        LogicalCommand::Left,
        LogicalCommand::Right,
        LogicalCommand::LightsFront,
        LogicalCommand::LightsRear,
        LogicalCommand::LightsSides,
        LogicalCommand::ModeIdle,
        LogicalCommand::ModeAi,
        LogicalCommand::ModeScenario,
        LogicalCommand::ModeRc,
        LogicalCommand::RescanDistances,
    ];

    /// Stable index into per-command tables.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable title, as shown in binding tables.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            LogicalCommand::Forward => "Forward",
            LogicalCommand::Reverse => "Reverse",
            LogicalCommand::Left => "Left",
            LogicalCommand::Right => "Right",
            LogicalCommand::LightsFront => "Lights Front",
            LogicalCommand::LightsRear => "Lights Rear",
            LogicalCommand::LightsSides => "Lights Sides",
            LogicalCommand::ModeIdle => "Mode Idle",
            LogicalCommand::ModeAi => "Mode AI",
            LogicalCommand::ModeScenario => "Mode Scenario",
            LogicalCommand::ModeRc => "Mode RC",
            LogicalCommand::RescanDistances => "Rescan Distances",
        }
    }

    /// Default keyboard binding as an evdev key code.
    #[must_use]
    pub fn default_key(self) -> u16 {
        let key = match self {
            LogicalCommand::Forward => Key::KEY_W,
            LogicalCommand::Reverse => Key::KEY_S,
            LogicalCommand::Left => Key::KEY_A,
            LogicalCommand::Right => Key::KEY_D,
            LogicalCommand::LightsFront => Key::KEY_Z,
            LogicalCommand::LightsRear => Key::KEY_X,
            LogicalCommand::LightsSides => Key::KEY_C,
            LogicalCommand::ModeIdle => Key::KEY_1,
            LogicalCommand::ModeAi => Key::KEY_2,
            LogicalCommand::ModeScenario => Key::KEY_3,
            LogicalCommand::ModeRc => Key::KEY_4,
            LogicalCommand::RescanDistances => Key::KEY_E,
        };
        key.code()
    }

    /// Wire token sent to the robot. Directional commands have none: they
    /// only feed the motion controller.
    #[must_use]
    pub fn wire_token(self) -> Option<&'static str> {
        match self {
            LogicalCommand::Forward
            | LogicalCommand::Reverse
            | LogicalCommand::Left
            | LogicalCommand::Right => None,
            LogicalCommand::LightsFront => Some("LF"),
            LogicalCommand::LightsRear => Some("LR"),
            LogicalCommand::LightsSides => Some("LS"),
            LogicalCommand::ModeIdle => Some(Mode::Idle.wire_token()),
            LogicalCommand::ModeAi => Some(Mode::Ai.wire_token()),
            LogicalCommand::ModeScenario => Some(Mode::Scenario.wire_token()),
            LogicalCommand::ModeRc => Some(Mode::Rc.wire_token()),
            LogicalCommand::RescanDistances => Some("R"),
        }
    }

    /// The direction this command steers, if it is directional.
    #[must_use]
    pub fn direction(self) -> Option<Direction> {
        match self {
            LogicalCommand::Forward => Some(Direction::Forward),
            LogicalCommand::Reverse => Some(Direction::Reverse),
            LogicalCommand::Left => Some(Direction::Left),
            LogicalCommand::Right => Some(Direction::Right),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_directional(self) -> bool {
        self.direction().is_some()
    }

    /// The mode this command selects, if it is a mode command.
    #[must_use]
    pub fn mode(self) -> Option<Mode> {
        match self {
            LogicalCommand::ModeIdle => Some(Mode::Idle),
            LogicalCommand::ModeAi => Some(Mode::Ai),
            LogicalCommand::ModeScenario => Some(Mode::Scenario),
            LogicalCommand::ModeRc => Some(Mode::Rc),
            _ => None,
        }
    }

    /// The light group this command switches, if it is a light command.
    #[must_use]
    pub fn light(self) -> Option<Light> {
        match self {
            LogicalCommand::LightsFront => Some(Light::Front),
            LogicalCommand::LightsRear => Some(Light::Rear),
            LogicalCommand::LightsSides => Some(Light::Sides),
            _ => None,
        }
    }
}

impl Mode {
    /// All modes, in indicator order.
    pub const ALL: [Mode; 4] = [Mode::Idle, Mode::Ai, Mode::Scenario, Mode::Rc];

    #[must_use]
    pub fn wire_token(self) -> &'static str {
        match self {
            Mode::Idle => "MI",
            Mode::Ai => "MA",
            Mode::Scenario => "MS",
            Mode::Rc => "MR",
        }
    }

    /// Looks up a mode by the selector letter following `M`.
    #[must_use]
    pub fn from_selector(selector: char) -> Option<Mode> {
        match selector {
            'I' => Some(Mode::Idle),
            'A' => Some(Mode::Ai),
            'S' => Some(Mode::Scenario),
            'R' => Some(Mode::Rc),
            _ => None,
        }
    }
}

impl Light {
    /// Index into per-light tables.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up a light group by the selector letter following `L`.
    #[must_use]
    pub fn from_selector(selector: char) -> Option<Light> {
        match selector {
            'F' => Some(Light::Front),
            'R' => Some(Light::Rear),
            'S' => Some(Light::Sides),
            _ => None,
        }
    }
}

/// A routed input: which command, and how strongly.
///
/// `value` is a magnitude in `[0, 1]` for analog sources and exactly `0` or
/// `1` for buttons and keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandRecord {
    command: LogicalCommand,
    value: f32,
}

impl CommandRecord {
    /// Creates a record, clamping `value` into `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use robo_remote::protocol::command::{CommandRecord, LogicalCommand};
    ///
    /// let rec = CommandRecord::new(LogicalCommand::Forward, 1.7);
    /// assert_eq!(rec.value(), 1.0);
    /// ```
    #[must_use]
    pub fn new(command: LogicalCommand, value: f32) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self { command, value }
    }

    /// A button press (`value = 1`).
    #[must_use]
    pub fn pressed(command: LogicalCommand) -> Self {
        Self::new(command, 1.0)
    }

    /// A button release (`value = 0`).
    #[must_use]
    pub fn released(command: LogicalCommand) -> Self {
        Self::new(command, 0.0)
    }

    #[must_use]
    pub fn command(&self) -> LogicalCommand {
        self.command
    }

    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// `true` for any non-zero value.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.value != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_declaration_order() {
        for (i, cmd) in LogicalCommand::ALL.iter().enumerate() {
            assert_eq!(cmd.index(), i, "{:?} has the wrong index", cmd);
        }
    }

    #[test]
    fn test_directional_commands_have_no_wire_token() {
        for cmd in LogicalCommand::ALL {
            assert_eq!(cmd.is_directional(), cmd.wire_token().is_none());
        }
    }

    #[test]
    fn test_wire_tokens() {
        let tokens: Vec<_> = LogicalCommand::ALL
            .iter()
            .filter_map(|c| c.wire_token())
            .collect();
        assert_eq!(tokens, vec!["LF", "LR", "LS", "MI", "MA", "MS", "MR", "R"]);
    }

    #[test]
    fn test_default_keys_are_unique() {
        let mut keys: Vec<u16> = LogicalCommand::ALL.iter().map(|c| c.default_key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), COMMAND_COUNT);
        assert_eq!(LogicalCommand::Forward.default_key(), Key::KEY_W.code());
        assert_eq!(LogicalCommand::RescanDistances.default_key(), Key::KEY_E.code());
    }

    #[test]
    fn test_mode_and_light_selectors() {
        assert_eq!(Mode::from_selector('A'), Some(Mode::Ai));
        assert_eq!(Mode::from_selector('X'), None);
        assert_eq!(Light::from_selector('S'), Some(Light::Sides));
        assert_eq!(LogicalCommand::ModeRc.mode(), Some(Mode::Rc));
        assert_eq!(LogicalCommand::LightsRear.light(), Some(Light::Rear));
        assert_eq!(LogicalCommand::Left.mode(), None);
    }

    #[test]
    fn test_command_record_clamps() {
        assert_eq!(CommandRecord::new(LogicalCommand::Left, -0.5).value(), 0.0);
        assert_eq!(CommandRecord::new(LogicalCommand::Left, f32::NAN).value(), 0.0);
        assert!(CommandRecord::pressed(LogicalCommand::Left).is_active());
        assert!(!CommandRecord::released(LogicalCommand::Left).is_active());
    }

    #[test]
    fn test_deserialize_snake_case_names() {
        #[derive(Deserialize)]
        struct Holder {
            cmd: LogicalCommand,
        }
        let holder: Holder = toml::from_str("cmd = \"mode_ai\"").unwrap();
        assert_eq!(holder.cmd, LogicalCommand::ModeAi);
    }
}
