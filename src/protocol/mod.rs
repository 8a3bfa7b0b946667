//! # Robot Wire Protocol
//!
//! Line-oriented ASCII protocol spoken with the robot firmware.
//!
//! This module handles:
//! - The logical command table (titles, default keys, wire tokens)
//! - Outbound motor and discrete command encoding
//! - Inbound telemetry sentence decoding

pub mod command;
pub mod decoder;
pub mod encoder;

/// Terminator appended to every outbound line.
pub const LINE_TERMINATOR: &str = "\n";

/// First character of a motor command.
pub const MOTOR_COMMAND_PREFIX: char = 'X';

/// First character of verbose robot output meant for a human console.
pub const VERBOSE_MARKER: char = '~';
