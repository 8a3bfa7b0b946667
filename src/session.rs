//! # Session
//!
//! The operator session: one task that owns the router, dispatcher,
//! telemetry state and transcript, and serializes every change to them.
//!
//! Input pumps, the connection reader and connect attempts all publish
//! [`SessionEvent`]s into one unbounded queue. The motion interval lives in
//! the same `select!`, so motor ticks never interleave with a half-applied
//! event.
//!
//! UI collaborators observe the session through [`ControlSurface`].

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::{
    ConnectionEvent, ConnectionListener, ConnectionManager, ConnectionState,
};
use crate::controller::bindings::BindingTable;
use crate::controller::router::{HidSample, InputRouter};
use crate::dispatcher::{CommandDispatcher, InputSource};
use crate::error::{ConnectError, Result};
use crate::protocol::command::{CommandRecord, Light, LogicalCommand, Mode};
use crate::telemetry::{LineDirection, TelemetryState, TranscriptLogger};

/// Callbacks for a UI collaborator. Every method defaults to a no-op.
pub trait ControlSurface {
    /// Speed slider moved, `-255..=255`.
    fn speed_changed(&mut self, _speed: i32) {}

    /// Turn slider moved, `-255..=255`.
    fn turn_changed(&mut self, _turn: i32) {}

    fn mode_selected(&mut self, _mode: Mode) {}

    fn light_changed(&mut self, _light: Light, _on: bool) {}

    fn connection_changed(&mut self, _state: ConnectionState) {}

    fn telemetry_changed(&mut self, _telemetry: &TelemetryState) {}

    /// Inbound lines and outbound discrete commands, for a console view.
    fn console_line(&mut self, _direction: LineDirection, _line: &str) {}
}

/// A surface that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl ControlSurface for NullSurface {}

/// Which input pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Keyboard,
    Controller,
}

/// Everything the session reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    Key { code: u16, pressed: bool },
    Hid(HidSample),
    /// A command issued directly by the UI.
    Command(CommandRecord),
    SetBindings(BindingTable),
    Connect(String),
    Disconnect,
    Connection(ConnectionEvent),
    ConnectFinished {
        attempt: u64,
        address: String,
        result: std::result::Result<(), ConnectError>,
    },
    Reconnect { attempt: u64 },
    /// An input pump ended; anything it was holding is released.
    InputLost(InputKind),
    Shutdown,
}

/// Sending side of the session queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { events }
    }

    /// Queue an event. Returns `false` once the session has stopped.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn key(&self, code: u16, pressed: bool) -> bool {
        self.send(SessionEvent::Key { code, pressed })
    }

    pub fn hid(&self, sample: HidSample) -> bool {
        self.send(SessionEvent::Hid(sample))
    }

    pub fn command(&self, rec: CommandRecord) -> bool {
        self.send(SessionEvent::Command(rec))
    }

    pub fn connect(&self, address: impl Into<String>) -> bool {
        self.send(SessionEvent::Connect(address.into()))
    }

    pub fn disconnect(&self) -> bool {
        self.send(SessionEvent::Disconnect)
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionEvent::Shutdown)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

impl ConnectionListener for SessionHandle {
    fn on_message(&self, line: String) {
        self.send(SessionEvent::Connection(ConnectionEvent::Message(line)));
    }

    fn on_disconnected(&self) {
        self.send(SessionEvent::Connection(ConnectionEvent::Disconnected));
    }
}

/// The operator session.
pub struct Session {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    handle: SessionHandle,
    router: InputRouter,
    dispatcher: CommandDispatcher,
    telemetry: TelemetryState,
    connection: ConnectionManager,
    transcript: Option<TranscriptLogger>,
    surface: Box<dyn ControlSurface + Send>,
    tick_interval: Duration,
    start_delay: Duration,
    rescan_every_ticks: u64,
    reconnect_interval: Option<Duration>,
    last_address: Option<String>,
    connect_attempt: u64,
    ticks: u64,
}

impl Session {
    /// Build a session from configuration.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the transcript directory cannot be created.
    pub fn new(config: &Config, surface: Box<dyn ControlSurface + Send>) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(tx);

        let transcript = if config.telemetry.enabled {
            Some(TranscriptLogger::new(&config.telemetry)?)
        } else {
            None
        };

        let connection = ConnectionManager::new(
            std::sync::Arc::new(handle.clone()),
            config.connection.connect_timeout(),
        );

        Ok(Self {
            events: rx,
            handle,
            router: InputRouter::new(config.binding_table()),
            dispatcher: CommandDispatcher::new(),
            telemetry: TelemetryState::new(),
            connection,
            transcript,
            surface,
            tick_interval: config.motion.tick_interval(),
            start_delay: config.motion.start_delay(),
            rescan_every_ticks: u64::from(config.motion.rescan_every_ticks),
            reconnect_interval: config.connection.reconnect_interval(),
            last_address: None,
            connect_attempt: 0,
            ticks: 0,
        })
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Process events until [`SessionEvent::Shutdown`].
    pub async fn run(mut self) {
        let mut motion = interval_at(Instant::now() + self.start_delay, self.tick_interval);
        motion.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Session started");

        loop {
            tokio::select! {
                _ = motion.tick() => self.on_motion_tick(),
                event = self.events.recv() => match event {
                    None | Some(SessionEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event),
                },
            }
        }

        self.connection.disconnect();
        info!("Session stopped after {} motion ticks", self.ticks);
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Key { code, pressed } => {
                if let Some(rec) = self.router.route_key_event(code, pressed) {
                    self.dispatch(rec, InputSource::Keyboard);
                }
            }
            SessionEvent::Hid(sample) => {
                let source = if sample.analog {
                    InputSource::HidAnalog
                } else {
                    InputSource::HidDigital
                };
                if let Some(rec) = self.router.route_hid_sample(&sample) {
                    self.dispatch(rec, source);
                }
            }
            SessionEvent::Command(rec) => self.dispatch(rec, InputSource::Synthetic),
            SessionEvent::SetBindings(table) => {
                info!("Binding table updated");
                self.router.set_bindings(table);
            }
            SessionEvent::Connect(address) => self.start_connect(address),
            SessionEvent::Disconnect => self.user_disconnect(),
            SessionEvent::Connection(ConnectionEvent::Message(line)) => self.on_message(&line),
            SessionEvent::Connection(ConnectionEvent::Disconnected) => self.on_connection_lost(),
            SessionEvent::ConnectFinished {
                attempt,
                address,
                result,
            } => self.on_connect_finished(attempt, address, result),
            SessionEvent::Reconnect { attempt } => {
                if attempt != self.connect_attempt || self.connection.is_connected() {
                    return;
                }
                if let Some(address) = self.last_address.clone() {
                    info!("Reconnecting to {}", address);
                    self.start_connect(address);
                }
            }
            SessionEvent::InputLost(kind) => {
                warn!("{:?} input lost, releasing held controls", kind);
                self.dispatcher.release_all(self.surface.as_mut());
            }
            SessionEvent::Shutdown => {}
        }
    }

    fn dispatch(&mut self, rec: CommandRecord, source: InputSource) {
        debug!("{:?} from {:?}", rec, source);
        if let Some(line) = self.dispatcher.on_command(rec, source, self.surface.as_mut()) {
            if self.send_line(&line) {
                self.surface.console_line(LineDirection::Tx, &line);
            }
        }
    }

    /// Returns `false` when there is no link to send on.
    fn send_line(&mut self, line: &str) -> bool {
        if !self.connection.send_message(line) {
            return false;
        }
        self.record(LineDirection::Tx, line);
        true
    }

    fn on_motion_tick(&mut self) {
        self.ticks += 1;

        let motor = self.dispatcher.motor_command();
        self.send_line(&motor.to_wire());

        if self.rescan_every_ticks > 0 && self.ticks % self.rescan_every_ticks == 0 {
            self.dispatch(
                CommandRecord::pressed(LogicalCommand::RescanDistances),
                InputSource::Synthetic,
            );
        }
    }

    fn on_message(&mut self, line: &str) {
        let line = line.trim();
        self.record(LineDirection::Rx, line);
        self.surface.console_line(LineDirection::Rx, line);

        if self.telemetry.apply_line(line) {
            self.surface.telemetry_changed(&self.telemetry);
        }
    }

    fn start_connect(&mut self, address: String) {
        self.connect_attempt += 1;
        let attempt = self.connect_attempt;
        self.last_address = Some(address.clone());

        self.reset_telemetry();
        self.surface.connection_changed(ConnectionState::Connecting);

        let connection = self.connection.clone();
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let result = connection.connect(&address).await;
            handle.send(SessionEvent::ConnectFinished {
                attempt,
                address,
                result,
            });
        });
    }

    fn on_connect_finished(
        &mut self,
        attempt: u64,
        address: String,
        result: std::result::Result<(), ConnectError>,
    ) {
        if attempt != self.connect_attempt {
            debug!("Ignoring outcome of superseded connect to {}", address);
            return;
        }

        match result {
            Ok(()) => self.surface.connection_changed(ConnectionState::Connected),
            Err(e) => {
                warn!("Connect to {} failed: {}", address, e);
                self.surface.connection_changed(ConnectionState::Failed);
                if e.is_transient() {
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn user_disconnect(&mut self) {
        // invalidates pending connect outcomes and reconnects
        self.connect_attempt += 1;
        self.last_address = None;

        self.connection.disconnect();
        self.reset_telemetry();
        self.surface.connection_changed(ConnectionState::Disconnected);
    }

    fn on_connection_lost(&mut self) {
        self.surface.connection_changed(ConnectionState::Failed);
        self.reset_telemetry();
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&self) {
        let (Some(interval), Some(_)) = (self.reconnect_interval, &self.last_address) else {
            return;
        };

        let attempt = self.connect_attempt;
        let handle = self.handle.clone();
        debug!("Reconnect scheduled in {:?}", interval);
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            handle.send(SessionEvent::Reconnect { attempt });
        });
    }

    fn reset_telemetry(&mut self) {
        if self.telemetry != TelemetryState::default() {
            self.telemetry.reset();
            self.surface.telemetry_changed(&self.telemetry);
        }
    }

    fn record(&mut self, direction: LineDirection, line: &str) {
        let Some(transcript) = self.transcript.as_mut() else {
            return;
        };
        if let Err(e) = transcript.record(direction, line) {
            warn!("Transcript write failed, recording stopped: {}", e);
            self.transcript = None;
        }
    }
}
