//! Serial transport: device discovery, the background byte pump, and
//! control writes (spec.md §4.3).
//!
//! Two threads touch this module's state: the foreground (this struct's
//! owner) issues writes and drains the queue, the background pump reads
//! and frames bytes. The split insulates the foreground from kernel read
//! latency and gives a single, clean cancellation point (spec.md §4.3
//! "Rationale for the split").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::{SerialPort, SerialPortInfo, SerialPortType};

use crate::error::TransportError;
use crate::queue::{PacketQueue, DEFAULT_CAPACITY};
use crate::slip::{Framer, SLIP_MAX};

const M8_VID: u16 = 0x16C0;
const M8_PID: u16 = 0x048A;
const BAUD_RATE: u32 = 115_200;
const SERIAL_READ_SIZE: usize = 1024;
const PUMP_POLL_INTERVAL: Duration = Duration::from_millis(4);
const WRITE_TIMEOUT: Duration = Duration::from_millis(5);
const DISPLAY_ENABLE_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Disconnected,
    Processing,
}

fn select_port(ports: &[SerialPortInfo], preferred: Option<&str>) -> Option<SerialPortInfo> {
    if let Some(pref) = preferred {
        if let Some(p) = ports.iter().find(|p| p.port_name == pref) {
            return Some(p.clone());
        }
    }
    ports
        .iter()
        .find(|p| matches!(&p.port_type, SerialPortType::UsbPort(info) if info.vid == M8_VID && info.pid == M8_PID))
        .cloned()
}

fn run_pump(mut port: Box<dyn SerialPort>, queue: Arc<PacketQueue>, stop: Arc<AtomicBool>, lost: Arc<AtomicBool>) {
    let mut framer = Framer::new(SLIP_MAX, {
        let queue = queue.clone();
        move |packet: &[u8]| queue.push(packet)
    });
    let mut scratch = [0u8; SERIAL_READ_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut scratch) {
            Ok(0) => {}
            Ok(n) => {
                for &byte in &scratch[..n] {
                    if let Err(e) = framer.read_byte(byte) {
                        log::warn!("transport: framing error, dropping in-flight packet: {e:?}");
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("transport: read failed, device lost: {e}");
                lost.store(true, Ordering::Relaxed);
                break;
            }
        }
        thread::sleep(PUMP_POLL_INTERVAL);
    }
}

/// Owns the open serial port and the background pump thread reading it.
pub struct SerialTransport {
    port: Mutex<Option<Box<dyn SerialPort>>>,
    queue: Arc<PacketQueue>,
    stop: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Enumerates ports, selects the M8 by VID/PID (preferring
    /// `preferred_device` if it names an attached port), opens it at
    /// 115200 baud, and starts the background pump.
    pub fn initialize(verbose: bool, preferred_device: Option<&str>) -> Result<Self, TransportError> {
        let ports = serialport::available_ports()?;
        let selected = select_port(&ports, preferred_device).ok_or(TransportError::DeviceNotFound)?;
        if verbose {
            log::info!("transport: opening {}", selected.port_name);
        }

        let write_handle = serialport::new(&selected.port_name, BAUD_RATE)
            .timeout(WRITE_TIMEOUT)
            .open()?;
        let read_handle = write_handle.try_clone()?;

        let queue = Arc::new(PacketQueue::new(DEFAULT_CAPACITY));
        let stop = Arc::new(AtomicBool::new(false));
        let lost = Arc::new(AtomicBool::new(false));

        let pump = thread::spawn({
            let queue = queue.clone();
            let stop = stop.clone();
            let lost = lost.clone();
            move || run_pump(read_handle, queue, stop, lost)
        });

        Ok(SerialTransport { port: Mutex::new(Some(write_handle)), queue, stop, lost, pump: Some(pump) })
    }

    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.port.lock().unwrap();
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        match port.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                // A bare timeout is not conclusive evidence the device is
                // gone (spec.md §5); any other write failure is.
                if e.kind() != std::io::ErrorKind::TimedOut {
                    self.lost.store(true, Ordering::Relaxed);
                }
                Err(TransportError::Io(e))
            }
        }
    }

    /// Sends the 2-byte controller frame `'C' mask`.
    pub fn send_controller(&self, mask: u8) -> Result<(), TransportError> {
        self.write(&[b'C', mask])
    }

    /// Sends the 3-byte keyjazz frame `'K' note velocity`, clamping
    /// velocity to 0x7F.
    pub fn send_keyjazz(&self, note: u8, velocity: u8) -> Result<(), TransportError> {
        self.write(&[b'K', note, velocity.min(0x7F)])
    }

    /// Writes `'E'`, settles 500ms, then `'R'` if `reset`.
    pub fn enable_display(&self, reset: bool) -> Result<(), TransportError> {
        self.write(&[b'E'])?;
        thread::sleep(DISPLAY_ENABLE_SETTLE);
        if reset {
            self.write(&[b'R'])?;
        }
        Ok(())
    }

    /// Drains the queue, calling `dispatch` on every packet (including
    /// zero-length ones — the decoder, not the transport, is responsible
    /// for ignoring those). Returns [`ProcessOutcome::Disconnected`] once
    /// the pump has observed a read failure or a write has failed
    /// outright.
    pub fn process_data(&self, mut dispatch: impl FnMut(&[u8])) -> ProcessOutcome {
        if self.lost.load(Ordering::Relaxed) {
            return ProcessOutcome::Disconnected;
        }
        while let Some(packet) = self.queue.pop() {
            dispatch(&packet);
        }
        ProcessOutcome::Processing
    }

    /// Stops the pump, joins it, tears down the queue, then drops the
    /// port. Always in this order — joining after closing the port would
    /// race the pump against a freed handle (spec.md §9).
    pub fn close(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.pump.take() {
            let _ = handle.join();
        }
        self.queue.destroy();
        *self.port.lock().unwrap() = None;
    }
}
