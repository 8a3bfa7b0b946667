//! # Motion Controller
//!
//! Converts speed/turn intent into a pair of track speeds.
//!
//! ## Wire Encoding
//!
//! | Value | Track |
//! |-------|-------|
//! | 0 | Full reverse |
//! | 255 | Stop |
//! | 511 | Full forward |
//!
//! The scale is not zero-centered: reverse spans `0..=255` and forward
//! `256..=511`, so the forward half of the analog law is offset from
//! [`FORWARD_BASE`] rather than [`MOTOR_STOP`].
//!
//! ## Paths
//!
//! 1. **Discrete**: any directional latch held. Analog targets are ignored.
//! 2. **Analog**: no latch held. Speed and turn targets in `-255..=255` are
//!    mixed into a leading track at full magnitude and a trailing track
//!    slowed by the turn component.
//!
//! ```
//! use robo_remote::controller::motion::{
//!     compute_motor_command, DirectionalLatchState, MotorCommand,
//! };
//!
//! let still = compute_motor_command(0, 0, DirectionalLatchState::default());
//! assert_eq!(still, MotorCommand::STOP);
//! ```

use crate::protocol::command::Direction;
use crate::protocol::encoder::{encode_motor_command, MOTOR_WIRE_MAX};

/// Wire value of a stopped track.
pub const MOTOR_STOP: i32 = 255;

/// Wire value of a track in full reverse.
pub const MOTOR_FULL_REVERSE: i32 = 0;

/// Wire value of a track in full forward.
pub const MOTOR_FULL_FORWARD: i32 = MOTOR_WIRE_MAX as i32;

/// Offset of the forward half of the analog law.
pub const FORWARD_BASE: i32 = MOTOR_STOP + 1;

/// Largest magnitude of the speed and turn targets.
pub const TARGET_MAX: i32 = 255;

/// Turn targets smaller than this are treated as straight ahead.
pub const TURN_DEAD_ZONE: i32 = 90;

/// Which directions are held down by a discrete source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionalLatchState {
    pub forward: bool,
    pub reverse: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionalLatchState {
    #[must_use]
    pub fn any(&self) -> bool {
        self.forward || self.reverse || self.left || self.right
    }

    #[must_use]
    pub fn get(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.forward,
            Direction::Reverse => self.reverse,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Forward => self.forward = held,
            Direction::Reverse => self.reverse = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }

    /// Per-direction OR of two latch sets.
    #[must_use]
    pub fn union(self, other: DirectionalLatchState) -> DirectionalLatchState {
        DirectionalLatchState {
            forward: self.forward || other.forward,
            reverse: self.reverse || other.reverse,
            left: self.left || other.left,
            right: self.right || other.right,
        }
    }
}

/// Track speeds in wire units (`0..=511`, 255 = stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub left: u16,
    pub right: u16,
}

impl MotorCommand {
    /// Both tracks stopped.
    pub const STOP: MotorCommand = MotorCommand {
        left: MOTOR_STOP as u16,
        right: MOTOR_STOP as u16,
    };

    fn clamped(left: i32, right: i32) -> Self {
        Self {
            left: left.clamp(MOTOR_FULL_REVERSE, MOTOR_FULL_FORWARD) as u16,
            right: right.clamp(MOTOR_FULL_REVERSE, MOTOR_FULL_FORWARD) as u16,
        }
    }

    /// The 7-character wire token, e.g. `X255255`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        encode_motor_command(self.left, self.right)
    }
}

/// Compute the motor command for one motion tick.
///
/// Targets outside `-255..=255` are clamped first. The result is always
/// within `0..=511` on both tracks.
#[must_use]
pub fn compute_motor_command(
    speed_target: i32,
    turn_target: i32,
    latches: DirectionalLatchState,
) -> MotorCommand {
    if latches.any() {
        discrete_command(latches)
    } else {
        analog_command(
            speed_target.clamp(-TARGET_MAX, TARGET_MAX),
            turn_target.clamp(-TARGET_MAX, TARGET_MAX),
        )
    }
}

fn discrete_command(latches: DirectionalLatchState) -> MotorCommand {
    let driving = latches.forward != latches.reverse;
    let steering = latches.left != latches.right;

    let full = if latches.reverse {
        MOTOR_FULL_REVERSE
    } else {
        MOTOR_FULL_FORWARD
    };

    match (driving, steering) {
        // spin in place toward the held side
        (false, true) if latches.left => {
            MotorCommand::clamped(MOTOR_FULL_REVERSE, MOTOR_FULL_FORWARD)
        }
        (false, true) => MotorCommand::clamped(MOTOR_FULL_FORWARD, MOTOR_FULL_REVERSE),
        (true, false) => MotorCommand::clamped(full, full),
        // the track opposite the held side leads, the other one stops
        (true, true) if latches.left => MotorCommand::clamped(MOTOR_STOP, full),
        (true, true) => MotorCommand::clamped(full, MOTOR_STOP),
        (false, false) => MotorCommand::STOP,
    }
}

fn analog_command(speed: i32, turn: i32) -> MotorCommand {
    let turn = if turn.abs() < TURN_DEAD_ZONE { 0 } else { turn };

    let magnitude = speed.abs().max(turn.abs());
    let hypot = f64::from(speed).hypot(f64::from(turn));
    let sin = if hypot == 0.0 {
        0.0
    } else {
        f64::from(turn.abs()) / hypot
    };
    let motor_delta = (2.0 * f64::from(magnitude) * sin).round() as i32;

    let (mut left, mut right) = if speed <= 0 {
        (
            MOTOR_STOP - magnitude + motor_delta,
            MOTOR_STOP - magnitude,
        )
    } else {
        (
            FORWARD_BASE + magnitude,
            FORWARD_BASE + magnitude - motor_delta,
        )
    };

    // left semicircle mirrors the right one
    if turn < 0 {
        std::mem::swap(&mut left, &mut right);
    }

    MotorCommand::clamped(left, right)
}
