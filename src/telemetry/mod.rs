//! # Telemetry Module
//!
//! Robot-reported state and the session transcript.
//!
//! This module handles:
//! - Applying decoded telemetry sentences to [`state::TelemetryState`]
//! - Writing robot traffic as JSONL (JSON Lines)
//! - Rotating transcript files (max N records per file)
//! - Retaining only the last M files

pub mod logger;
pub mod state;

pub use logger::{LineDirection, TranscriptLogger};
pub use state::TelemetryState;
