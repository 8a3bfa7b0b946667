//! # Binding Table
//!
//! Maps raw input identifiers to logical commands.
//!
//! Each command has at most one keyboard key and one HID component. A key or
//! component maps to at most one command: assigning it to a command clears
//! it from whichever command held it before (last write wins).
//!
//! HID component identifiers are evdev names. Analog axes carry a `+` or `-`
//! prefix selecting the half of the axis, e.g. `-ABS_Y` for stick up.

use std::collections::HashMap;

use crate::protocol::command::{LogicalCommand, COMMAND_COUNT};

/// Bindings for a single command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingEntry {
    /// evdev key code
    pub key: Option<u16>,
    /// HID component id, optionally sign-prefixed
    pub hid: Option<String>,
}

/// The published command bindings.
///
/// # Examples
///
/// ```
/// use robo_remote::controller::bindings::BindingTable;
/// use robo_remote::protocol::command::LogicalCommand;
///
/// let mut table = BindingTable::with_defaults();
/// table.set_hid(LogicalCommand::Forward, Some("-ABS_Y".to_string()));
///
/// assert_eq!(table.command_for_hid("-ABS_Y"), Some(LogicalCommand::Forward));
/// assert_eq!(table.command_for_key(17), Some(LogicalCommand::Forward)); // KEY_W
/// ```
#[derive(Debug, Clone)]
pub struct BindingTable {
    entries: [BindingEntry; COMMAND_COUNT],
    by_key: HashMap<u16, LogicalCommand>,
    by_hid: HashMap<String, LogicalCommand>,
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BindingTable {
    /// Creates a table with no bindings at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Default::default(),
            by_key: HashMap::new(),
            by_hid: HashMap::new(),
        }
    }

    /// Creates a table with the default key for every command and no HID
    /// bindings.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        for command in LogicalCommand::ALL {
            table.set_key(command, Some(command.default_key()));
        }
        table
    }

    /// Binds `key` to `command`, clearing it from any other command.
    ///
    /// `None` (or key code 0) unbinds the command's key.
    pub fn set_key(&mut self, command: LogicalCommand, key: Option<u16>) {
        let key = key.filter(|&code| code != 0);

        if let Some(code) = key {
            for entry in self.entries.iter_mut() {
                if entry.key == Some(code) {
                    entry.key = None;
                }
            }
        }
        self.entries[command.index()].key = key;
        self.rebuild();
    }

    /// Binds HID component `id` to `command`, clearing it from any other
    /// command.
    ///
    /// `None` (or an empty id) unbinds the command's HID component.
    pub fn set_hid(&mut self, command: LogicalCommand, id: Option<String>) {
        let id = id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        if let Some(ref id) = id {
            for entry in self.entries.iter_mut() {
                if entry.hid.as_deref() == Some(id.as_str()) {
                    entry.hid = None;
                }
            }
        }
        self.entries[command.index()].hid = id;
        self.rebuild();
    }

    /// Clears every HID binding, e.g. after switching to another controller.
    pub fn clear_hid(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.hid = None;
        }
        self.rebuild();
    }

    #[must_use]
    pub fn entry(&self, command: LogicalCommand) -> &BindingEntry {
        &self.entries[command.index()]
    }

    #[must_use]
    pub fn command_for_key(&self, code: u16) -> Option<LogicalCommand> {
        self.by_key.get(&code).copied()
    }

    #[must_use]
    pub fn command_for_hid(&self, id: &str) -> Option<LogicalCommand> {
        self.by_hid.get(id).copied()
    }

    fn rebuild(&mut self) {
        self.by_key.clear();
        self.by_hid.clear();

        for command in LogicalCommand::ALL {
            let entry = &self.entries[command.index()];
            if let Some(code) = entry.key {
                self.by_key.insert(code, command);
            }
            if let Some(ref id) = entry.hid {
                self.by_hid.insert(id.clone(), command);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::Key;

    #[test]
    fn test_defaults_bind_every_key() {
        let table = BindingTable::with_defaults();
        for command in LogicalCommand::ALL {
            assert_eq!(table.command_for_key(command.default_key()), Some(command));
            assert!(table.entry(command).hid.is_none());
        }
    }

    #[test]
    fn test_empty_table_has_no_bindings() {
        let table = BindingTable::empty();
        assert_eq!(table.command_for_key(Key::KEY_W.code()), None);
    }

    #[test]
    fn test_reassigning_key_clears_previous_owner() {
        let mut table = BindingTable::with_defaults();
        let w = Key::KEY_W.code();

        table.set_key(LogicalCommand::RescanDistances, Some(w));

        assert_eq!(table.command_for_key(w), Some(LogicalCommand::RescanDistances));
        assert_eq!(table.entry(LogicalCommand::Forward).key, None);
        // the old rescan key is no longer bound
        assert_eq!(table.command_for_key(Key::KEY_E.code()), None);
    }

    #[test]
    fn test_reassigning_hid_clears_previous_owner() {
        let mut table = BindingTable::empty();
        table.set_hid(LogicalCommand::Left, Some("BTN_WEST".to_string()));
        table.set_hid(LogicalCommand::ModeAi, Some("BTN_WEST".to_string()));

        assert_eq!(table.command_for_hid("BTN_WEST"), Some(LogicalCommand::ModeAi));
        assert_eq!(table.entry(LogicalCommand::Left).hid, None);
    }

    #[test]
    fn test_signed_axis_halves_are_distinct() {
        let mut table = BindingTable::empty();
        table.set_hid(LogicalCommand::Forward, Some("-ABS_Y".to_string()));
        table.set_hid(LogicalCommand::Reverse, Some("+ABS_Y".to_string()));

        assert_eq!(table.command_for_hid("-ABS_Y"), Some(LogicalCommand::Forward));
        assert_eq!(table.command_for_hid("+ABS_Y"), Some(LogicalCommand::Reverse));
        assert_eq!(table.command_for_hid("ABS_Y"), None);
    }

    #[test]
    fn test_unbinding() {
        let mut table = BindingTable::with_defaults();
        table.set_key(LogicalCommand::Forward, Some(0));
        assert_eq!(table.command_for_key(Key::KEY_W.code()), None);

        table.set_hid(LogicalCommand::Forward, Some("BTN_SOUTH".to_string()));
        table.set_hid(LogicalCommand::Forward, Some("  ".to_string()));
        assert_eq!(table.command_for_hid("BTN_SOUTH"), None);
    }

    #[test]
    fn test_clear_hid_keeps_keys() {
        let mut table = BindingTable::with_defaults();
        table.set_hid(LogicalCommand::Right, Some("+ABS_X".to_string()));
        table.clear_hid();

        assert_eq!(table.command_for_hid("+ABS_X"), None);
        assert_eq!(table.command_for_key(Key::KEY_D.code()), Some(LogicalCommand::Right));
    }
}
