//! Configuration file loading (spec.md §6). Scoped as an external
//! collaborator in spec.md §1 ("configuration file loading (§6 names the
//! shape only)"), but a runnable crate needs one; this is a small,
//! self-contained implementation rather than a pulled-in INI crate, since
//! neither the teacher nor the wider example pack has an INI-parsing
//! precedent to imitate and the format here is simple enough that
//! mirroring the original loader's split/trim/lookup approach directly
//! is the more faithful choice (see DESIGN.md).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Resolved `[graphics]`/`[keyboard]` configuration (spec.md §6). Keycodes
/// are raw Linux input-event-codes; `input::KeyMap` converts the ones it
/// consumes into `evdev::Key`.
#[derive(Debug, Clone)]
pub struct Config {
    pub filename: PathBuf,
    pub wait_packets: u32,

    pub key_up: u16,
    pub key_left: u16,
    pub key_down: u16,
    pub key_right: u16,
    pub key_select: u16,
    pub key_select_alt: u16,
    pub key_start: u16,
    pub key_start_alt: u16,
    pub key_opt: u16,
    pub key_opt_alt: u16,
    pub key_edit: u16,
    pub key_edit_alt: u16,
    pub key_delete: u16,
    pub key_reset: u16,
    pub key_jazz_inc_octave: u16,
    pub key_jazz_dec_octave: u16,
    pub key_jazz_inc_velocity: u16,
    pub key_jazz_dec_velocity: u16,
}

impl Config {
    /// Default Linux input-event-codes, matching the original
    /// implementation's defaults.
    pub fn defaults(filename: PathBuf) -> Self {
        Config {
            filename,
            wait_packets: 256,
            key_up: 103,    // KEY_UP
            key_left: 105,  // KEY_LEFT
            key_down: 108,  // KEY_DOWN
            key_right: 106, // KEY_RIGHT
            key_select: 42,      // KEY_LEFTSHIFT
            key_select_alt: 44,  // KEY_Z
            key_start: 57,       // KEY_SPACE
            key_start_alt: 45,   // KEY_X
            key_opt: 56,         // KEY_LEFTALT
            key_opt_alt: 30,     // KEY_A
            key_edit: 29,        // KEY_LEFTCTRL
            key_edit_alt: 31,    // KEY_S
            key_delete: 111,     // KEY_DELETE
            key_reset: 19,       // KEY_R
            key_jazz_inc_octave: 55,   // KEY_KPASTERISK
            key_jazz_dec_octave: 98,   // KEY_KPSLASH
            key_jazz_inc_velocity: 78, // KEY_KPPLUS
            key_jazz_dec_velocity: 74, // KEY_KPMINUS
        }
    }

    /// Loads `path`, falling back to defaults if the file is missing or
    /// malformed. Either way, the resolved configuration is written back
    /// (spec.md §6, §9): a fresh file gets defaults, an existing one gets
    /// canonicalized. This can discard hand-written comments — documented,
    /// not fixed, per spec.md §9's open question.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut conf = Config::defaults(path.to_path_buf());
        match fs::read_to_string(path) {
            Ok(contents) => {
                let sections = parse_ini(&contents);
                apply_section(&sections, "graphics", &mut conf);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ConfigError::Io(e)),
        }
        conf.write()?;
        Ok(conf)
    }

    /// Canonicalizes the configuration back to `self.filename`.
    pub fn write(&self) -> Result<(), ConfigError> {
        let mut out = String::new();
        out.push_str("[graphics]\n");
        out.push_str(&format!("wait_packets={}\n", self.wait_packets));
        out.push_str("[keyboard]\n");
        macro_rules! kv {
            ($field:ident) => {
                out.push_str(&format!("{}={}\n", stringify!($field), self.$field));
            };
        }
        kv!(key_up);
        kv!(key_left);
        kv!(key_down);
        kv!(key_right);
        kv!(key_select);
        kv!(key_select_alt);
        kv!(key_start);
        kv!(key_start_alt);
        kv!(key_opt);
        kv!(key_opt_alt);
        kv!(key_edit);
        kv!(key_edit_alt);
        kv!(key_delete);
        kv!(key_reset);
        kv!(key_jazz_inc_octave);
        kv!(key_jazz_dec_octave);
        kv!(key_jazz_inc_velocity);
        kv!(key_jazz_dec_velocity);

        let mut file = fs::File::create(&self.filename)?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

type Sections = HashMap<String, HashMap<String, String>>;

fn parse_ini(contents: &str) -> Sections {
    let mut sections: Sections = HashMap::new();
    let mut current = String::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('[') {
            if let Some(end) = stripped.find(']') {
                current = stripped[..end].to_string();
            }
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    sections
}

fn apply_section(sections: &Sections, _unused: &str, conf: &mut Config) {
    if let Some(graphics) = sections.get("graphics") {
        if let Some(v) = graphics.get("wait_packets").and_then(|v| v.parse().ok()) {
            conf.wait_packets = v;
        }
    }
    if let Some(keyboard) = sections.get("keyboard") {
        macro_rules! read_key {
            ($field:ident) => {
                if let Some(v) = keyboard.get(stringify!($field)).and_then(|v| v.parse().ok()) {
                    conf.$field = v;
                }
            };
        }
        read_key!(key_up);
        read_key!(key_left);
        read_key!(key_down);
        read_key!(key_right);
        read_key!(key_select);
        read_key!(key_select_alt);
        read_key!(key_start);
        read_key!(key_start_alt);
        read_key!(key_opt);
        read_key!(key_opt_alt);
        read_key!(key_edit);
        read_key!(key_edit_alt);
        read_key!(key_delete);
        read_key!(key_reset);
        read_key!(key_jazz_inc_octave);
        read_key!(key_jazz_dec_octave);
        read_key!(key_jazz_inc_velocity);
        read_key!(key_jazz_dec_velocity);
    }
}
