//! Telemetry state reported by the robot.

use crate::protocol::command::{Light, Mode};
use crate::protocol::decoder::{decode_sentence, ProximityFlags, RangeSensor, TelemetrySentence};

/// Latest robot-reported values. Fields start unknown and are filled in as
/// sentences arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryState {
    pub mode: Option<Mode>,
    pub lights: [bool; 3],
    pub distance_front_left: Option<u32>,
    pub distance_front: Option<u32>,
    pub distance_front_right: Option<u32>,
    pub proximity: ProximityFlags,
}

impl TelemetryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one inbound line and apply it.
    ///
    /// Returns `true` if the line was a telemetry sentence. Unrecognized
    /// lines leave every field untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use robo_remote::telemetry::state::TelemetryState;
    ///
    /// let mut state = TelemetryState::new();
    /// assert!(state.apply_line("RO1001"));
    /// assert!(state.proximity.front_left && state.proximity.front_right);
    /// ```
    pub fn apply_line(&mut self, line: &str) -> bool {
        match decode_sentence(line) {
            Some(sentence) => {
                self.apply(sentence);
                true
            }
            None => false,
        }
    }

    /// Apply an already decoded sentence.
    pub fn apply(&mut self, sentence: TelemetrySentence) {
        match sentence {
            TelemetrySentence::Mode(mode) => self.mode = Some(mode),
            TelemetrySentence::Light { light, on } => self.lights[light.index()] = on,
            TelemetrySentence::Distance { sensor, value } => {
                let slot = match sensor {
                    RangeSensor::FrontLeft => &mut self.distance_front_left,
                    RangeSensor::Front => &mut self.distance_front,
                    RangeSensor::FrontRight => &mut self.distance_front_right,
                };
                *slot = Some(value);
            }
            TelemetrySentence::Proximity(flags) => self.proximity = flags,
        }
    }

    #[must_use]
    pub fn light(&self, light: Light) -> bool {
        self.lights[light.index()]
    }

    /// Forget everything, as after a disconnect.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
