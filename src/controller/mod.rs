//! # Controller Module
//!
//! Keyboard and HID controller input handling.
//!
//! This module handles:
//! - Input device detection and connection via evdev
//! - Normalizing analog axes and applying the dead zone
//! - Mapping raw events to logical commands through the binding table
//! - Turning speed/turn targets and latches into motor commands

pub mod bindings;
pub mod calibration;
pub mod device;
pub mod mapper;
pub mod motion;
pub mod poller;
pub mod router;
