//! # Connection Module
//!
//! Owns the TCP link to the robot.
//!
//! ## Architecture
//!
//! - **Reader task**: a single long-lived task. Between sessions it is
//!   parked on a channel receive; `connect()` resumes it by handing over the
//!   read half of the new socket. Each complete line goes to
//!   [`ConnectionListener::on_message`].
//! - **Writer task**: one per session. [`ConnectionManager::send_message`]
//!   only queues the line, so callers never wait on the socket.
//!
//! ## Lifecycle
//!
//! `Disconnected -> Connecting -> Connected`, back to `Disconnected` on
//! [`ConnectionManager::disconnect`] or when the link fails. Every session
//! carries a generation number; a read failure from anything but the
//! current connected session is a teardown artifact and is swallowed.
//! [`ConnectionListener::on_disconnected`] fires once per unsolicited loss,
//! never for a user disconnect.

pub mod address;

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::ConnectError;
use crate::protocol::LINE_TERMINATOR;
use address::RobotAddress;

/// Default time allowed for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Link state as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Only ever shown on a control surface, after a failed attempt or an
    /// unsolicited loss. The manager itself reports `Disconnected` then.
    Failed,
}

/// Receives inbound traffic and link loss notifications.
///
/// Called from the reader task; implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionListener {
    /// One complete inbound line, terminator stripped.
    fn on_message(&self, line: String);

    /// The link failed while connected.
    fn on_disconnected(&self);
}

/// Listener shared between the manager and its reader task.
pub type SharedListener = Arc<dyn ConnectionListener + Send + Sync>;

/// Connection listener output, for listeners that are channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Message(String),
    Disconnected,
}

impl ConnectionListener for mpsc::UnboundedSender<ConnectionEvent> {
    fn on_message(&self, line: String) {
        let _ = self.send(ConnectionEvent::Message(line));
    }

    fn on_disconnected(&self) {
        let _ = self.send(ConnectionEvent::Disconnected);
    }
}

/// A connected socket handed to the reader task.
struct ReaderSession {
    generation: u64,
    reader: OwnedReadHalf,
    cancel: oneshot::Receiver<()>,
}

struct Inner {
    state: ConnectionState,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cancel: Option<oneshot::Sender<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    listener: SharedListener,
    sessions: mpsc::UnboundedSender<ReaderSession>,
    connect_timeout: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by the reader when its session ends without being cancelled.
    fn connection_lost(&self, generation: u64, reason: &str) {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != ConnectionState::Connected {
            debug!("Ignoring end of stale session {}: {}", generation, reason);
            return;
        }

        inner.state = ConnectionState::Disconnected;
        inner.generation += 1;
        inner.outbound = None;
        inner.cancel = None;
        drop(inner);

        error!("Connection to robot lost: {}", reason);
        self.listener.on_disconnected();
    }
}

/// Handle to the robot link. Cheap to clone; all clones share one link.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("connect_timeout", &self.shared.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager and start its reader task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(listener: SharedListener, connect_timeout: Duration) -> Self {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                generation: 0,
                outbound: None,
                cancel: None,
            }),
            listener: Arc::clone(&listener),
            sessions: sessions_tx,
            connect_timeout,
        });

        tokio::spawn(reader_loop(Arc::downgrade(&shared), listener, sessions_rx));
        Self { shared }
    }

    /// Open a session to `address` (`host:port`).
    ///
    /// Any existing session is closed first, without notifying the listener.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress`: `address` is not `host:port`; nothing else is
    ///   touched
    /// - `Unreachable`: the TCP connect failed or timed out
    /// - `Aborted`: `disconnect()` or another `connect()` happened meanwhile
    pub async fn connect(&self, address: &str) -> Result<(), ConnectError> {
        let target = RobotAddress::parse(address)?;
        self.disconnect();

        let generation = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.state = ConnectionState::Connecting;
            inner.generation
        };
        info!("Connecting to robot at {}", target);

        let attempt = tokio::time::timeout(
            self.shared.connect_timeout,
            TcpStream::connect(target.to_socket_string()),
        )
        .await;

        let stream = match attempt {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(self.attempt_failed(generation, &target, source)),
            Err(_) => {
                let source = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
                return Err(self.attempt_failed(generation, &target, source));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on robot socket: {}", e);
        }

        let (reader, writer) = stream.into_split();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        {
            let mut inner = self.shared.lock();
            if inner.generation != generation || inner.state != ConnectionState::Connecting {
                info!("Connection attempt to {} superseded", target);
                return Err(ConnectError::Aborted(target.to_string()));
            }
            inner.state = ConnectionState::Connected;
            inner.outbound = Some(spawn_writer(writer));
            inner.cancel = Some(cancel_tx);
        }

        let session = ReaderSession {
            generation,
            reader,
            cancel: cancel_rx,
        };
        if self.shared.sessions.send(session).is_err() {
            error!("Reader task is gone, dropping session to {}", target);
            self.disconnect();
            return Err(ConnectError::Aborted(target.to_string()));
        }

        info!("Connected to robot at {}", target);
        Ok(())
    }

    fn attempt_failed(
        &self,
        generation: u64,
        target: &RobotAddress,
        source: io::Error,
    ) -> ConnectError {
        let mut inner = self.shared.lock();
        if inner.generation == generation {
            inner.state = ConnectionState::Disconnected;
        }
        drop(inner);

        error!("Failed to connect to robot at {}: {}", target, source);
        ConnectError::Unreachable {
            address: target.to_string(),
            source,
        }
    }

    /// Close the current session, if any.
    ///
    /// Idempotent. Parks the reader task and never fires `on_disconnected`.
    pub fn disconnect(&self) {
        let mut inner = self.shared.lock();
        if inner.state == ConnectionState::Disconnected {
            return;
        }

        let previous = inner.state;
        inner.state = ConnectionState::Disconnected;
        inner.generation += 1;
        inner.outbound = None;
        if let Some(cancel) = inner.cancel.take() {
            let _ = cancel.send(());
        }
        drop(inner);

        info!("Disconnected from robot (was {:?})", previous);
    }

    /// Queue one line for the robot. The terminator is appended here.
    ///
    /// Returns `false` (and does nothing) when not connected.
    pub fn send_message(&self, line: &str) -> bool {
        let inner = self.shared.lock();
        match (&inner.outbound, inner.state) {
            (Some(outbound), ConnectionState::Connected) => outbound.send(line.to_string()).is_ok(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }
}

fn spawn_writer(mut writer: OwnedWriteHalf) -> mpsc::UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            line.push_str(LINE_TERMINATOR);
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!("Write to robot failed: {}", e);
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    tx
}

async fn reader_loop(
    shared: Weak<Shared>,
    listener: SharedListener,
    mut sessions: mpsc::UnboundedReceiver<ReaderSession>,
) {
    // parked here between sessions
    while let Some(session) = sessions.recv().await {
        let ReaderSession {
            generation,
            reader,
            mut cancel,
        } = session;
        debug!("Reader resumed for session {}", generation);

        let mut lines = BufReader::new(reader).lines();
        let failure = loop {
            tokio::select! {
                biased;
                _ = &mut cancel => break None,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => listener.on_message(line),
                    Ok(None) => break Some("closed by robot".to_string()),
                    Err(e) => break Some(e.to_string()),
                },
            }
        };

        match failure {
            None => debug!("Reader for session {} parked after disconnect", generation),
            Some(reason) => match shared.upgrade() {
                Some(shared) => shared.connection_lost(generation, &reason),
                None => return,
            },
        }
    }
    debug!("Reader task stopped");
}
