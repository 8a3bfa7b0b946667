//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.

use serde::de::{Error, IntoDeserializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::connection::address::RobotAddress;
use crate::controller::bindings::BindingTable;
use crate::error::{RoboRemoteError, Result};
use crate::protocol::command::{LogicalCommand, COMMAND_COUNT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-command overrides, keyed by snake_case command name
    #[serde(default)]
    pub bindings: HashMap<String, BindingConfig>,
}

/// Robot link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    /// `host:port`; empty means do not connect on startup
    #[serde(default)]
    pub address: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Delay before retrying after an unsolicited loss; `0` disables
    #[serde(default)]
    pub reconnect_interval_ms: u64,
}

/// Input device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// HID controller name; empty selects the first one found
    #[serde(default)]
    pub device_name: String,

    /// Keyboard device name; empty selects the first one found
    #[serde(default)]
    pub keyboard_device: String,

    #[serde(default = "default_enabled")]
    pub keyboard_enabled: bool,

    #[serde(default = "default_enabled")]
    pub hid_enabled: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Motion tick configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Send a distance rescan every N ticks; `0` disables
    #[serde(default = "default_rescan_every_ticks")]
    pub rescan_every_ticks: u32,
}

/// Session transcript configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Record all traffic instead of only verbose robot output
    #[serde(default)]
    pub show_all: bool,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; unset logs to stderr only
    #[serde(default)]
    pub file_dir: Option<String>,
}

/// Binding override for one command
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BindingConfig {
    /// evdev key code; `0` unbinds the key
    #[serde(default)]
    pub key: Option<u16>,

    /// HID component id, e.g. `BTN_SOUTH` or `-ABS_Y`; empty unbinds
    #[serde(default)]
    pub hid: Option<String>,
}

// Default value functions
fn default_connect_timeout_ms() -> u64 { 3000 }

fn default_enabled() -> bool { true }
fn default_poll_interval_ms() -> u64 { 50 }

fn default_tick_interval_ms() -> u64 { 100 }
fn default_start_delay_ms() -> u64 { 1000 }
fn default_rescan_every_ticks() -> u32 { 5 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_interval_ms: 0,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            keyboard_device: String::new(),
            keyboard_enabled: default_enabled(),
            hid_enabled: default_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            start_delay_ms: default_start_delay_ms(),
            rescan_every_ticks: default_rescan_every_ticks(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            log_dir: default_log_dir(),
            show_all: false,
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `None` when automatic reconnect is off.
    pub fn reconnect_interval(&self) -> Option<Duration> {
        (self.reconnect_interval_ms > 0).then(|| Duration::from_millis(self.reconnect_interval_ms))
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl MotionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

fn config_error(msg: impl std::fmt::Display) -> RoboRemoteError {
    RoboRemoteError::Config(toml::de::Error::custom(msg))
}

fn parse_command_name(name: &str) -> Result<LogicalCommand> {
    let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        name.into_deserializer();
    LogicalCommand::deserialize(deserializer)
        .map_err(|_| config_error(format!("unknown command '{}' in [bindings]", name)))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robo_remote::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Address may be empty (no auto-connect)
        if !self.connection.address.is_empty() {
            RobotAddress::parse(&self.connection.address)
                .map_err(|e| config_error(format!("connection address: {}", e)))?;
        }

        if self.connection.connect_timeout_ms == 0 || self.connection.connect_timeout_ms > 60000 {
            return Err(config_error("connect_timeout_ms must be between 1 and 60000"));
        }

        if self.connection.reconnect_interval_ms > 600000 {
            return Err(config_error("reconnect_interval_ms must be at most 600000"));
        }

        if self.controller.poll_interval_ms == 0 || self.controller.poll_interval_ms > 1000 {
            return Err(config_error("poll_interval_ms must be between 1 and 1000"));
        }

        if self.motion.tick_interval_ms == 0 || self.motion.tick_interval_ms > 10000 {
            return Err(config_error("tick_interval_ms must be between 1 and 10000"));
        }

        if self.motion.start_delay_ms > 60000 {
            return Err(config_error("start_delay_ms must be at most 60000"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(config_error("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(config_error("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(config_error("max_files_to_keep must be greater than 0"));
        }

        if let Some(dir) = &self.logging.file_dir {
            if dir.is_empty() {
                return Err(config_error("logging file_dir cannot be empty when set"));
            }
        }

        for name in self.bindings.keys() {
            parse_command_name(name)?;
        }

        Ok(())
    }

    /// Build the binding table: defaults first, then the `[bindings]`
    /// overrides in command declaration order.
    ///
    /// A key or HID id claimed by a later command is cleared from earlier
    /// ones. Unknown command names are skipped; `validate` rejects them.
    pub fn binding_table(&self) -> BindingTable {
        let mut overrides: [Option<&BindingConfig>; COMMAND_COUNT] = [None; COMMAND_COUNT];
        for (name, binding) in &self.bindings {
            if let Ok(command) = parse_command_name(name) {
                overrides[command.index()] = Some(binding);
            }
        }

        let mut table = BindingTable::with_defaults();
        for command in LogicalCommand::ALL {
            let Some(binding) = overrides[command.index()] else {
                continue;
            };
            if let Some(key) = binding.key {
                table.set_key(command, Some(key));
            }
            if let Some(hid) = &binding.hid {
                table.set_hid(command, Some(hid.clone()));
            }
        }
        table
    }
}
