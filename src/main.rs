//! # RoboRemote
//!
//! Teleoperate a tracked robot from the keyboard or a gamepad.
//!
//! ```bash
//! robo-remote [config.toml]
//! robo-remote --list-controllers
//! ```
//!
//! Without an argument `config/default.toml` is used when present, built-in
//! defaults otherwise. Set `RUST_LOG=robo_remote=debug` for per-event logs.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use robo_remote::config::{Config, LoggingConfig};
use robo_remote::connection::ConnectionState;
use robo_remote::controller::device::InputDevice;
use robo_remote::controller::poller::{spawn_controller_pump, spawn_keyboard_pump};
use robo_remote::protocol::command::Mode;
use robo_remote::protocol::decoder::is_verbose;
use robo_remote::protocol::VERBOSE_MARKER;
use robo_remote::session::{ControlSurface, Session, SessionHandle};
use robo_remote::telemetry::{LineDirection, TelemetryState};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Terminal surface: reports the link and robot output through tracing.
#[derive(Debug, Default)]
struct LogSurface;

impl ControlSurface for LogSurface {
    fn mode_selected(&mut self, mode: Mode) {
        info!("Mode {:?} selected", mode);
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        match state {
            ConnectionState::Failed => warn!("Robot link: {:?}", state),
            _ => info!("Robot link: {:?}", state),
        }
    }

    fn telemetry_changed(&mut self, telemetry: &TelemetryState) {
        debug!("Telemetry: {:?}", telemetry);
    }

    fn console_line(&mut self, direction: LineDirection, line: &str) {
        if direction == LineDirection::Rx && is_verbose(line) {
            info!("robot: {}", line.trim_start_matches(VERBOSE_MARKER));
        }
    }
}

/// Load the configuration named on the command line, or the default one.
fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Install the tracing subscriber. The returned guard flushes the log file
/// on drop.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = match &logging.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "robo-remote.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Open the configured input devices and start their pumps.
///
/// A missing device is not fatal: the robot can still be driven from the
/// other one, or just monitored.
fn start_input(config: &Config, handle: &SessionHandle) {
    let controller = &config.controller;

    if controller.keyboard_enabled {
        match InputDevice::open_keyboard(&controller.keyboard_device) {
            Ok(device) => {
                if let Err(e) = spawn_keyboard_pump(device, handle.clone()) {
                    warn!("Failed to start keyboard input: {}", e);
                }
            }
            Err(e) => warn!("Keyboard input unavailable: {}", e),
        }
    }

    if controller.hid_enabled {
        match InputDevice::open_controller(&controller.device_name) {
            Ok(device) => {
                let poll_interval = controller.poll_interval();
                if let Err(e) = spawn_controller_pump(device, handle.clone(), poll_interval) {
                    warn!("Failed to start controller input: {}", e);
                }
            }
            Err(e) => warn!("Controller input unavailable: {}", e),
        }
    }
}

/// Main entry point for RoboRemote
///
/// # Control Flow
///
/// 1. Load configuration and set up logging
/// 2. Start the session, the input pumps and, if an address is configured,
///    the connection to the robot
/// 3. Run until Ctrl+C, then stop the session, which disconnects cleanly
#[tokio::main]
async fn main() -> Result<()> {
    let arg = std::env::args().nth(1);

    if arg.as_deref() == Some("--list-controllers") {
        for name in InputDevice::list_controllers()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = load_config(arg.as_deref())?;
    let _log_guard = init_logging(&config.logging);

    info!("RoboRemote v{} starting...", env!("CARGO_PKG_VERSION"));

    let session = Session::new(&config, Box::new(LogSurface))?;
    let handle = session.handle();
    let session_task = tokio::spawn(session.run());

    start_input(&config, &handle);

    if config.connection.address.is_empty() {
        info!("No robot address configured, not connecting");
    } else {
        handle.connect(config.connection.address.clone());
    }

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;

    info!("Received Ctrl+C, shutting down...");
    handle.shutdown();
    session_task.await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        assert!(load_config(Some("/nonexistent/robo-remote.toml")).is_err());
    }

    #[test]
    fn test_bundled_default_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert!(config.connection.address.is_empty());
        assert_eq!(config.motion.tick_interval_ms, 100);
    }

    #[test]
    fn test_log_surface_ignores_plain_lines() {
        let mut surface = LogSurface;
        surface.console_line(LineDirection::Rx, "RF120");
        surface.console_line(LineDirection::Rx, "~ready");
        surface.console_line(LineDirection::Tx, "MI");
    }
}
