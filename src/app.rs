//! Connection state machine and frame cadence (spec.md §4.7).
//!
//! Owns every other collaborator and is the only place their lifetimes are
//! threaded together: config, input, display, and (optionally, depending
//! on whether a device is attached) the serial transport.

use std::thread;
use std::time::Duration;

use evdev::Key;

use crate::command::Command;
use crate::config::Config;
use crate::display::Display;
use crate::input::{InputAdapter, KeyMap};
use crate::command::CommandDecoder;
use crate::transport::{ProcessOutcome, SerialTransport};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const RECONNECT_INTERVAL: Duration = Duration::from_millis(500);
const FRAMEBUFFER_DEVICE: &str = "/dev/fb0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppState {
    Run,
    WaitForDevice,
    Quit,
}

fn keymap_from_config(config: &Config) -> KeyMap {
    KeyMap {
        key_up: Key::new(config.key_up),
        key_left: Key::new(config.key_left),
        key_down: Key::new(config.key_down),
        key_right: Key::new(config.key_right),
        key_select: Key::new(config.key_select),
        key_select_alt: Key::new(config.key_select_alt),
        key_start: Key::new(config.key_start),
        key_start_alt: Key::new(config.key_start_alt),
        key_opt: Key::new(config.key_opt),
        key_opt_alt: Key::new(config.key_opt_alt),
        key_edit: Key::new(config.key_edit),
        key_edit_alt: Key::new(config.key_edit_alt),
    }
}

fn dispatch(display: &mut Display, decoder: &mut CommandDecoder, packet: &[u8]) {
    let Some(command) = decoder.decode(packet) else { return };
    match command {
        Command::DrawRectangle { pos, size, color } => display.draw_rectangle(pos, size, color),
        Command::DrawCharacter { ch, pos, fg, bg } => display.draw_character(ch, pos, fg, bg),
        Command::DrawOscilloscope { color, samples } => display.draw_waveform(color, &samples),
        Command::SetFontMode(mode) => display.set_font_mode(mode),
        // Echoed back by the device; this core has nothing to react to here.
        Command::JoypadState => {}
    }
}

/// Everything INITIALIZE wires together and RUN/WAIT_FOR_DEVICE/QUIT share.
pub struct App {
    preferred_device: Option<String>,
    verbose: bool,
    input: InputAdapter,
    display: Display,
    decoder: CommandDecoder,
    transport: Option<SerialTransport>,
}

impl App {
    /// INITIALIZE: opens input and the framebuffer (both fatal on
    /// failure, spec.md §6 "Exit codes"), then attempts serial discovery
    /// (not fatal — a missing device just starts the loop in
    /// WAIT_FOR_DEVICE).
    pub fn initialize(config: &Config, preferred_device: Option<String>, verbose: bool) -> anyhow::Result<Self> {
        let input = InputAdapter::discover(keymap_from_config(config))?;
        let display = Display::open(FRAMEBUFFER_DEVICE)?;
        let transport = match SerialTransport::initialize(verbose, preferred_device.as_deref()) {
            Ok(t) => Some(t),
            Err(e) => {
                log::info!("app: no device yet ({e}), starting in WAIT_FOR_DEVICE");
                None
            }
        };

        Ok(App { preferred_device, verbose, input, display, decoder: CommandDecoder::new(), transport })
    }

    /// Runs RUN/WAIT_FOR_DEVICE until QUIT, then releases collaborators in
    /// the order spec.md §4.7 prescribes. Returns the process exit code.
    pub fn run(mut self) -> i32 {
        let mut state = if self.transport.is_some() { AppState::Run } else { AppState::WaitForDevice };
        if state == AppState::Run {
            if let Some(t) = &self.transport {
                if let Err(e) = t.enable_display(true) {
                    log::warn!("app: enable_display failed at startup: {e}");
                }
            }
        }

        loop {
            state = match state {
                AppState::Run => self.tick_run(),
                AppState::WaitForDevice => self.tick_wait_for_device(),
                AppState::Quit => break,
            };
        }

        self.shutdown();
        0
    }

    fn poll_input(&mut self) -> bool {
        match self.input.poll() {
            Ok(result) => {
                if let Some(mask) = result.mask {
                    if let Some(transport) = &self.transport {
                        if let Err(e) = transport.send_controller(mask) {
                            log::warn!("app: failed to send controller state: {e}");
                        }
                    }
                }
                result.quit
            }
            Err(e) => {
                log::warn!("app: input poll failed: {e}");
                false
            }
        }
    }

    fn tick_run(&mut self) -> AppState {
        if self.poll_input() {
            return AppState::Quit;
        }

        let outcome = match &self.transport {
            Some(transport) => {
                let display = &mut self.display;
                let decoder = &mut self.decoder;
                transport.process_data(|packet| dispatch(display, decoder, packet))
            }
            None => ProcessOutcome::Disconnected,
        };

        self.display.render_frame();
        thread::sleep(FRAME_INTERVAL);

        if outcome == ProcessOutcome::Disconnected {
            log::info!("app: device disconnected");
            self.display.clear_screen();
            if let Some(transport) = self.transport.take() {
                transport.close();
            }
            AppState::WaitForDevice
        } else {
            AppState::Run
        }
    }

    fn tick_wait_for_device(&mut self) -> AppState {
        if self.poll_input() {
            return AppState::Quit;
        }

        thread::sleep(RECONNECT_INTERVAL);
        match SerialTransport::initialize(self.verbose, self.preferred_device.as_deref()) {
            Ok(transport) => {
                if let Err(e) = transport.enable_display(true) {
                    log::warn!("app: enable_display failed on reconnect: {e}");
                }
                self.transport = Some(transport);
                AppState::Run
            }
            Err(_) => AppState::WaitForDevice,
        }
    }

    fn shutdown(self) {
        let App { display, input, transport, .. } = self;
        drop(display);
        drop(input);
        if let Some(transport) = transport {
            transport.close();
        }
    }
}
