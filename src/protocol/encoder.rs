//! # Wire Encoder
//!
//! Formats outbound robot commands. The line terminator is appended by the
//! connection layer, not here.

use super::command::LogicalCommand;
use super::MOTOR_COMMAND_PREFIX;

/// Largest value a track speed can take on the wire.
pub const MOTOR_WIRE_MAX: u16 = 511;

/// Encode a motor command as `X` + 3-digit left + 3-digit right.
///
/// Speeds above [`MOTOR_WIRE_MAX`] are clamped so the token is always
/// exactly 7 characters.
///
/// # Examples
///
/// ```
/// use robo_remote::protocol::encoder::encode_motor_command;
///
/// assert_eq!(encode_motor_command(255, 255), "X255255");
/// assert_eq!(encode_motor_command(0, 511), "X000511");
/// ```
#[must_use]
pub fn encode_motor_command(left: u16, right: u16) -> String {
    format!(
        "{}{:03}{:03}",
        MOTOR_COMMAND_PREFIX,
        left.min(MOTOR_WIRE_MAX),
        right.min(MOTOR_WIRE_MAX)
    )
}

/// Encode a discrete command token, optionally followed by a `0`/`1` flag.
///
/// Returns `None` for directional commands, which have no token.
#[must_use]
pub fn encode_discrete_command(command: LogicalCommand, flag: Option<bool>) -> Option<String> {
    let token = command.wire_token()?;
    Some(match flag {
        Some(true) => format!("{}1", token),
        Some(false) => format!("{}0", token),
        None => token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_command_is_zero_padded() {
        assert_eq!(encode_motor_command(5, 42), "X005042");
        assert_eq!(encode_motor_command(511, 0), "X511000");
    }

    #[test]
    fn test_motor_command_length_is_fixed() {
        for (l, r) in [(0, 0), (9, 99), (255, 511), (1000, 1000)] {
            assert_eq!(encode_motor_command(l, r).len(), 7);
        }
    }

    #[test]
    fn test_motor_command_clamps_out_of_range() {
        assert_eq!(encode_motor_command(600, 512), "X511511");
    }

    #[test]
    fn test_discrete_with_flag() {
        assert_eq!(
            encode_discrete_command(LogicalCommand::LightsFront, Some(true)).as_deref(),
            Some("LF1")
        );
        assert_eq!(
            encode_discrete_command(LogicalCommand::RescanDistances, Some(false)).as_deref(),
            Some("R0")
        );
    }

    #[test]
    fn test_discrete_without_flag() {
        assert_eq!(
            encode_discrete_command(LogicalCommand::ModeIdle, None).as_deref(),
            Some("MI")
        );
    }

    #[test]
    fn test_directional_has_no_token() {
        assert!(encode_discrete_command(LogicalCommand::Forward, Some(true)).is_none());
    }
}
