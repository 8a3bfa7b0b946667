//! # Device Pumps
//!
//! Each input device is read on its own OS thread, since evdev reads
//! block. Pumps publish into the session queue and stop when the device
//! fails or the session is gone. A pump that stops because of the device
//! tells the session with [`SessionEvent::InputLost`].
//!
//! The keyboard pump forwards events as they arrive. The controller pump
//! drains everything queued, then sleeps one poll interval, so an axis
//! sweeping fast produces at most one batch per interval.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use evdev::InputEvent;
use tracing::{debug, info, warn};

use super::device::InputDevice;
use super::mapper::{map_keyboard_event, EventMapper};
use crate::error::Result;
use crate::session::{InputKind, SessionEvent, SessionHandle};

/// Something that yields batches of raw input events.
pub trait EventSource {
    /// Block until at least one event is available.
    fn fetch(&mut self) -> Result<Vec<InputEvent>>;
}

impl EventSource for InputDevice {
    fn fetch(&mut self) -> Result<Vec<InputEvent>> {
        Ok(self.fetch_events()?.collect())
    }
}

/// Why a pump returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    DeviceFailed,
    SessionClosed,
}

/// Forward keyboard transitions until the device or the session goes away.
pub fn pump_keyboard<S: EventSource>(source: &mut S, handle: &SessionHandle) -> PumpExit {
    loop {
        let events = match source.fetch() {
            Ok(events) => events,
            Err(e) => {
                warn!("Keyboard input stopped: {}", e);
                handle.send(SessionEvent::InputLost(InputKind::Keyboard));
                return PumpExit::DeviceFailed;
            }
        };

        for transition in events.iter().filter_map(map_keyboard_event) {
            if !handle.key(transition.code, transition.pressed) {
                return PumpExit::SessionClosed;
            }
        }
    }
}

/// Forward controller samples, one drained batch per `poll_interval`.
pub fn pump_controller<S: EventSource>(
    source: &mut S,
    mapper: &EventMapper,
    handle: &SessionHandle,
    poll_interval: Duration,
) -> PumpExit {
    loop {
        let events = match source.fetch() {
            Ok(events) => events,
            Err(e) => {
                warn!("Controller input stopped: {}", e);
                handle.send(SessionEvent::InputLost(InputKind::Controller));
                return PumpExit::DeviceFailed;
            }
        };

        // arrival order is preserved within and across batches
        for sample in events.iter().filter_map(|event| mapper.map_controller_event(event)) {
            if !handle.hid(sample) {
                return PumpExit::SessionClosed;
            }
        }

        thread::sleep(poll_interval);
    }
}

/// Run the keyboard pump on a named thread.
pub fn spawn_keyboard_pump(
    mut device: InputDevice,
    handle: SessionHandle,
) -> Result<JoinHandle<()>> {
    info!("Reading keyboard {:?}", device.name());
    let thread = thread::Builder::new()
        .name("keyboard-pump".to_string())
        .spawn(move || {
            let exit = pump_keyboard(&mut device, &handle);
            debug!("Keyboard pump finished: {:?}", exit);
        })?;
    Ok(thread)
}

/// Run the controller pump on a named thread.
///
/// Axis ranges are read from the device once, before the thread starts.
pub fn spawn_controller_pump(
    mut device: InputDevice,
    handle: SessionHandle,
    poll_interval: Duration,
) -> Result<JoinHandle<()>> {
    let mapper = EventMapper::with_calibrations(device.axis_calibrations()?);
    info!("Polling controller {:?} every {:?}", device.name(), poll_interval);

    let thread = thread::Builder::new()
        .name("controller-pump".to_string())
        .spawn(move || {
            let exit = pump_controller(&mut device, &mapper, &handle, poll_interval);
            debug!("Controller pump finished: {:?}", exit);
        })?;
    Ok(thread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::router::HidSample;
    use crate::error::RoboRemoteError;
    use evdev::{AbsoluteAxisType, EventType, Key};
    use std::collections::VecDeque;
    use tokio::sync::mpsc;

    /// Replays canned batches, then fails like an unplugged device.
    struct ScriptedSource {
        batches: VecDeque<Vec<InputEvent>>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Vec<InputEvent>>) -> Self {
            Self {
                batches: batches.into(),
            }
        }
    }

    impl EventSource for ScriptedSource {
        fn fetch(&mut self) -> Result<Vec<InputEvent>> {
            self.batches
                .pop_front()
                .ok_or_else(|| RoboRemoteError::Controller("device unplugged".to_string()))
        }
    }

    fn key(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    fn syn() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_keyboard_pump_forwards_transitions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(tx);
        let mut source = ScriptedSource::new(vec![
            vec![key(Key::KEY_W, 1), syn()],
            vec![key(Key::KEY_W, 2), key(Key::KEY_W, 0), syn()],
        ]);

        let exit = pump_keyboard(&mut source, &handle);
        assert_eq!(exit, PumpExit::DeviceFailed);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        let w = Key::KEY_W.code();
        assert!(matches!(events[0], SessionEvent::Key { code, pressed: true } if code == w));
        assert!(matches!(events[1], SessionEvent::Key { pressed: false, .. }));
        assert!(matches!(events[2], SessionEvent::InputLost(InputKind::Keyboard)));
    }

    #[test]
    fn test_keyboard_pump_stops_when_session_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = SessionHandle::new(tx);
        let mut source = ScriptedSource::new(vec![vec![key(Key::KEY_A, 1)]]);

        assert_eq!(pump_keyboard(&mut source, &handle), PumpExit::SessionClosed);
    }

    #[test]
    fn test_controller_pump_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(tx);
        let mut source = ScriptedSource::new(vec![vec![
            InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, 255),
            key(Key::BTN_SOUTH, 1),
            syn(),
            InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, 0),
        ]]);

        let poll = Duration::from_millis(1);
        let exit = pump_controller(&mut source, &EventMapper::new(), &handle, poll);
        assert_eq!(exit, PumpExit::DeviceFailed);

        let samples: Vec<HidSample> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Hid(sample) => Some(sample),
                _ => None,
            })
            .collect();
        assert_eq!(samples.len(), 3);
        assert_eq!((samples[0].component.as_str(), samples[0].value), ("ABS_X", 1.0));
        assert_eq!((samples[1].component.as_str(), samples[1].analog), ("BTN_SOUTH", false));
        assert_eq!((samples[2].component.as_str(), samples[2].value), ("ABS_X", -1.0));
    }

    #[test]
    fn test_controller_pump_reports_loss() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(tx);
        let mut source = ScriptedSource::new(vec![]);

        pump_controller(&mut source, &EventMapper::new(), &handle, Duration::from_millis(1));
        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [SessionEvent::InputLost(InputKind::Controller)]));
    }
}
