//! # Input Device Module
//!
//! Discovers and opens keyboards and HID controllers through the Linux
//! evdev interface.
//!
//! ## Device Detection
//!
//! All `/dev/input/event*` nodes are scanned in sorted order:
//! - A **controller** is any device exposing absolute axes together with a
//!   gamepad or joystick button (gamepads, joysticks, wheels, rudders).
//! - A **keyboard** is any device exposing both `KEY_W` and `KEY_ENTER`.
//!
//! Devices that cannot be opened (usually permissions) are skipped.

use std::collections::HashMap;
use std::path::Path;

use evdev::{Device, InputEvent, Key};
use tracing::{debug, info};

use super::calibration::AxisCalibration;
use crate::error::{RoboRemoteError, Result};

const INPUT_DIR: &str = "/dev/input";

/// Buttons that only gamepads and joysticks report.
const JOYSTICK_BUTTONS: [Key; 3] = [Key::BTN_SOUTH, Key::BTN_TRIGGER, Key::BTN_THUMB];

/// What kind of device to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Controller,
}

impl DeviceKind {
    fn matches(self, device: &Device) -> bool {
        match self {
            DeviceKind::Keyboard => device
                .supported_keys()
                .map_or(false, |keys| keys.contains(Key::KEY_W) && keys.contains(Key::KEY_ENTER)),
            DeviceKind::Controller => {
                let has_axes = device
                    .supported_absolute_axes()
                    .map_or(false, |axes| axes.iter().next().is_some());
                // touchpads and tablets also report axes but no joystick buttons
                let has_buttons = device.supported_keys().map_or(false, |keys| {
                    JOYSTICK_BUTTONS.iter().any(|&button| keys.contains(button))
                });
                has_axes && has_buttons
            }
        }
    }
}

/// An opened evdev input device.
pub struct InputDevice {
    device: Device,
    device_path: String,
    kind: DeviceKind,
}

impl std::fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDevice")
            .field("device_path", &self.device_path)
            .field("kind", &self.kind)
            .field("name", &self.device.name())
            .finish_non_exhaustive()
    }
}

impl InputDevice {
    /// Open a controller by name, or the first controller when `name` is
    /// empty.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no matching device
    /// - `Controller`: `/dev/input` cannot be read
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robo_remote::controller::device::InputDevice;
    ///
    /// let pad = InputDevice::open_controller("")?;
    /// println!("Using {:?} at {}", pad.name(), pad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_controller(name: &str) -> Result<Self> {
        Self::open(DeviceKind::Controller, name)
    }

    /// Open a keyboard by name, or the first keyboard when `name` is empty.
    pub fn open_keyboard(name: &str) -> Result<Self> {
        Self::open(DeviceKind::Keyboard, name)
    }

    /// Names of every controller currently visible.
    pub fn list_controllers() -> Result<Vec<String>> {
        Ok(scan(DeviceKind::Controller)?
            .into_iter()
            .filter_map(|(_, device)| device.name().map(str::to_string))
            .collect())
    }

    fn open(kind: DeviceKind, name: &str) -> Result<Self> {
        for (path, device) in scan(kind)? {
            if !name.is_empty() && device.name() != Some(name) {
                continue;
            }

            info!("Using {:?} device {:?} at {}", kind, device.name(), path);
            return Ok(Self {
                device,
                device_path: path,
                kind,
            });
        }

        let wanted = if name.is_empty() { "any" } else { name };
        Err(RoboRemoteError::ControllerNotFound(format!("{:?} ({})", kind, wanted)))
    }

    /// Get the `/dev/input/eventX` path this device was opened from.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Human-readable device name reported by the driver.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Reported range of every absolute axis, keyed by axis code.
    pub fn axis_calibrations(&self) -> Result<HashMap<u16, AxisCalibration>> {
        let mut calibrations = HashMap::new();
        let Some(axes) = self.device.supported_absolute_axes() else {
            return Ok(calibrations);
        };

        let state = self
            .device
            .get_abs_state()
            .map_err(|e| {
                RoboRemoteError::Controller(format!("Failed to read axis ranges: {}", e))
            })?;

        for axis in axes.iter() {
            if let Some(info) = state.get(axis.0 as usize) {
                calibrations.insert(axis.0, AxisCalibration::new(info.minimum, info.maximum));
            }
        }
        Ok(calibrations)
    }

    /// Fetch the events queued on the device.
    ///
    /// Blocks until at least one event is available.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if fetching fails (e.g., device unplugged).
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| RoboRemoteError::Controller(format!("Failed to fetch events: {}", e)))
    }
}

fn scan(kind: DeviceKind) -> Result<Vec<(String, Device)>> {
    let input_dir = Path::new(INPUT_DIR);

    if !input_dir.exists() {
        return Err(RoboRemoteError::Controller(format!("{} directory not found", INPUT_DIR)));
    }

    let mut entries: Vec<_> = std::fs::read_dir(input_dir)
        .map_err(|e| RoboRemoteError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            RoboRemoteError::Controller(format!("Failed to read directory entry: {}", e))
        })?;

    // deterministic selection when several devices match
    entries.sort_by_key(|entry| entry.path());

    let mut found = Vec::new();
    for entry in entries {
        let path = entry.path();
        let is_event_node = path
            .file_name()
            .map_or(false, |f| f.to_string_lossy().starts_with("event"));
        if !is_event_node {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                debug!("Found input device: {} ({:?})", path.display(), device.name());
                if kind.matches(&device) {
                    found.push((path.to_string_lossy().to_string(), device));
                }
            }
            Err(e) => debug!("Could not open {}: {}", path.display(), e),
        }
    }
    Ok(found)
}
