//! # Telemetry Decoder
//!
//! Decodes inbound robot sentences. Unknown or malformed lines decode to
//! `None`; they are never an error.
//!
//! | Sentence | Meaning |
//! |----------|---------|
//! | `MI` `MA` `MS` `MR` | Mode acknowledgement |
//! | `L{F,R,S}{0,1}` | Light state |
//! | `R{L,F,R}<digits>` | Distance reading (front-left, front, front-right) |
//! | `RO<4 x 0/1>` | Proximity flags: front-left, ground-left, ground-right, front-right |

use super::command::{Light, Mode};
use super::VERBOSE_MARKER;

/// Which range finder a distance reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSensor {
    FrontLeft,
    Front,
    FrontRight,
}

/// Obstacle and ground-loss flags. `true` means obstacle ahead or ground
/// missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProximityFlags {
    pub front_left: bool,
    pub ground_left: bool,
    pub ground_right: bool,
    pub front_right: bool,
}

/// A decoded telemetry sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetrySentence {
    Mode(Mode),
    Light { light: Light, on: bool },
    Distance { sensor: RangeSensor, value: u32 },
    Proximity(ProximityFlags),
}

/// Returns `true` for verbose robot output (lines starting with `~`).
#[must_use]
pub fn is_verbose(line: &str) -> bool {
    line.starts_with(VERBOSE_MARKER)
}

/// Decode one inbound line.
///
/// Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use robo_remote::protocol::decoder::{decode_sentence, TelemetrySentence};
/// use robo_remote::protocol::command::Mode;
///
/// assert_eq!(decode_sentence("MA"), Some(TelemetrySentence::Mode(Mode::Ai)));
/// assert_eq!(decode_sentence("Z"), None);
/// ```
#[must_use]
pub fn decode_sentence(line: &str) -> Option<TelemetrySentence> {
    let line = line.trim();
    let bytes = line.as_bytes();
    if bytes.len() < 2 || !line.is_ascii() {
        return None;
    }

    match bytes[0] {
        b'M' if bytes.len() == 2 => {
            Mode::from_selector(bytes[1] as char).map(TelemetrySentence::Mode)
        }
        b'L' if bytes.len() == 3 => {
            let light = Light::from_selector(bytes[1] as char)?;
            let on = parse_flag(bytes[2])?;
            Some(TelemetrySentence::Light { light, on })
        }
        b'R' => decode_range(bytes),
        _ => None,
    }
}

fn decode_range(bytes: &[u8]) -> Option<TelemetrySentence> {
    let sensor = match bytes[1] {
        b'O' => return decode_proximity(&bytes[2..]),
        b'L' => RangeSensor::FrontLeft,
        b'F' => RangeSensor::Front,
        b'R' => RangeSensor::FrontRight,
        _ => return None,
    };

    let digits = &bytes[2..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    // all-ASCII was checked by the caller
    let value = std::str::from_utf8(digits).ok()?.parse().ok()?;
    Some(TelemetrySentence::Distance { sensor, value })
}

fn decode_proximity(flags: &[u8]) -> Option<TelemetrySentence> {
    if flags.len() != 4 {
        return None;
    }
    Some(TelemetrySentence::Proximity(ProximityFlags {
        front_left: parse_flag(flags[0])?,
        ground_left: parse_flag(flags[1])?,
        ground_right: parse_flag(flags[2])?,
        front_right: parse_flag(flags[3])?,
    }))
}

fn parse_flag(byte: u8) -> Option<bool> {
    match byte {
        b'0' => Some(false),
        b'1' => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_modes() {
        for mode in Mode::ALL {
            assert_eq!(
                decode_sentence(mode.wire_token()),
                Some(TelemetrySentence::Mode(mode))
            );
        }
    }

    #[test]
    fn test_decode_unknown_mode_is_ignored() {
        assert_eq!(decode_sentence("MX"), None);
        assert_eq!(decode_sentence("MIX"), None);
    }

    #[test]
    fn test_decode_lights() {
        assert_eq!(
            decode_sentence("LF1"),
            Some(TelemetrySentence::Light { light: Light::Front, on: true })
        );
        assert_eq!(
            decode_sentence("LS0"),
            Some(TelemetrySentence::Light { light: Light::Sides, on: false })
        );
        assert_eq!(decode_sentence("LR2"), None);
        assert_eq!(decode_sentence("LF"), None);
        assert_eq!(decode_sentence("LQ1"), None);
    }

    #[test]
    fn test_decode_distances() {
        assert_eq!(
            decode_sentence("RL123"),
            Some(TelemetrySentence::Distance { sensor: RangeSensor::FrontLeft, value: 123 })
        );
        assert_eq!(
            decode_sentence("RF7"),
            Some(TelemetrySentence::Distance { sensor: RangeSensor::Front, value: 7 })
        );
        assert_eq!(
            decode_sentence("RR045"),
            Some(TelemetrySentence::Distance { sensor: RangeSensor::FrontRight, value: 45 })
        );
    }

    #[test]
    fn test_decode_malformed_distance() {
        assert_eq!(decode_sentence("RF"), None);
        assert_eq!(decode_sentence("RF12a"), None);
        assert_eq!(decode_sentence("RX12"), None);
        assert_eq!(decode_sentence("RF99999999999"), None);
    }

    #[test]
    fn test_decode_proximity() {
        assert_eq!(
            decode_sentence("RO1001"),
            Some(TelemetrySentence::Proximity(ProximityFlags {
                front_left: true,
                ground_left: false,
                ground_right: false,
                front_right: true,
            }))
        );
    }

    #[test]
    fn test_decode_proximity_needs_exactly_four_flags() {
        assert_eq!(decode_sentence("RO100"), None);
        assert_eq!(decode_sentence("RO10011"), None);
        assert_eq!(decode_sentence("RO10a1"), None);
    }

    #[test]
    fn test_short_and_unknown_lines() {
        assert_eq!(decode_sentence(""), None);
        assert_eq!(decode_sentence("Z"), None);
        assert_eq!(decode_sentence("M"), None);
        assert_eq!(decode_sentence("~booting"), None);
        assert_eq!(decode_sentence("Xyz"), None);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(decode_sentence("  MR\r"), Some(TelemetrySentence::Mode(Mode::Rc)));
    }

    #[test]
    fn test_is_verbose() {
        assert!(is_verbose("~Robot ready"));
        assert!(!is_verbose("MI"));
    }
}
