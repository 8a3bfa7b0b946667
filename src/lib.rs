//! # RoboRemote Library
//!
//! Teleoperate a tracked robot over a line-oriented TCP link.
//!
//! This library provides the core functionality for turning keyboard and
//! HID controller input into robot motor and accessory commands, and for
//! decoding the telemetry the robot sends back.

pub mod config;
pub mod connection;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod session;
pub mod telemetry;
