//! Input adapter: discovers a keyboard-capable input device and
//! translates key events into controller bitmask updates and a quit
//! signal (spec.md §4.6).

use std::os::unix::io::AsRawFd;

use evdev::{Device, EventType, InputEventKind, Key};

use crate::error::InputError;

pub const BIT_EDIT: u8 = 1 << 0;
pub const BIT_OPT: u8 = 1 << 1;
pub const BIT_RIGHT: u8 = 1 << 2;
pub const BIT_START: u8 = 1 << 3;
pub const BIT_SELECT: u8 = 1 << 4;
pub const BIT_DOWN: u8 = 1 << 5;
pub const BIT_UP: u8 = 1 << 6;
pub const BIT_LEFT: u8 = 1 << 7;

/// The `[keyboard]` keycodes consulted while polling (spec.md §6). Only
/// the keys spec.md §4.6 actually wires into bitmask logic live here;
/// `key_delete`/`key_reset`/keyjazz keycodes are parsed by [`crate::config`]
/// but have no defined behavior in this core and are left for a future
/// keyjazz mode to consume.
#[derive(Debug, Clone, Copy)]
pub struct KeyMap {
    pub key_up: Key,
    pub key_left: Key,
    pub key_down: Key,
    pub key_right: Key,
    pub key_select: Key,
    pub key_select_alt: Key,
    pub key_start: Key,
    pub key_start_alt: Key,
    pub key_opt: Key,
    pub key_opt_alt: Key,
    pub key_edit: Key,
    pub key_edit_alt: Key,
}

impl KeyMap {
    fn bit_for(&self, key: Key) -> Option<u8> {
        match key {
            k if k == self.key_up => Some(BIT_UP),
            k if k == self.key_left => Some(BIT_LEFT),
            k if k == self.key_down => Some(BIT_DOWN),
            k if k == self.key_right => Some(BIT_RIGHT),
            k if k == self.key_select || k == self.key_select_alt => Some(BIT_SELECT),
            k if k == self.key_start || k == self.key_start_alt => Some(BIT_START),
            k if k == self.key_opt || k == self.key_opt_alt => Some(BIT_OPT),
            k if k == self.key_edit || k == self.key_edit_alt => Some(BIT_EDIT),
            _ => None,
        }
    }
}

/// The effect of one [`InputAdapter::poll`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    /// Set if the bitmask changed at least once during this poll; holds
    /// the final value, since only the latest state matters to the wire.
    pub mask: Option<u8>,
    pub quit: bool,
}

pub struct InputAdapter {
    device: Device,
    keymap: KeyMap,
    mask: u8,
}

impl InputAdapter {
    /// Probes `/dev/input/event0..9` and accepts the first device that
    /// reports key events (spec.md §4.6 Discovery).
    pub fn discover(keymap: KeyMap) -> Result<Self, InputError> {
        for i in 0..10 {
            let path = format!("/dev/input/event{i}");
            let device = match Device::open(&path) {
                Ok(d) => d,
                Err(_) => continue,
            };
            if device.supported_events().contains(EventType::KEY) {
                // Non-blocking reads, matching the original O_RDONLY|O_NONBLOCK open.
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL, 0);
                    libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                }
                log::info!("input: using {} ({})", path, device.name().unwrap_or("unknown"));
                return Ok(InputAdapter { device, keymap, mask: 0 });
            }
        }
        Err(InputError::NoKeyboardFound)
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Drains pending key events, updating the bitmask and watching for
    /// Escape. Auto-repeat (`value == 2`) is ignored — the bitmask
    /// reflects physical key state only (spec.md §4.6).
    pub fn poll(&mut self) -> Result<PollResult, InputError> {
        let mut result = PollResult::default();
        let events = match self.device.fetch_events() {
            Ok(events) => events,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(result),
            Err(e) => return Err(InputError::Io(e)),
        };
        for ev in events {
            let InputEventKind::Key(key) = ev.kind() else { continue };
            let value = ev.value();
            if value == 2 {
                continue;
            }
            let pressed = value == 1;
            if let Some(bit) = self.keymap.bit_for(key) {
                if pressed {
                    self.mask |= bit;
                } else {
                    self.mask &= !bit;
                }
                result.mask = Some(self.mask);
            }
            if key == Key::KEY_ESC && pressed {
                result.quit = true;
            }
        }
        Ok(result)
    }
}
