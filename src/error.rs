use thiserror::Error;

/// Errors surfaced by the serial transport (spec.md §4.3, §7 "device-absent" /
/// "transport-lost").
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serialport: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// No attached device matched the M8 VID/PID, and no preferred device
    /// path was found either.
    #[error("no M8 device found")]
    DeviceNotFound,

    /// The port was never opened (or has since been closed) but a write or
    /// control operation was attempted.
    #[error("serial port is not open")]
    NotConnected,
}

/// Errors surfaced by configuration loading (spec.md §6, §7 "configuration").
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config value for key `{0}`: `{1}`")]
    InvalidValue(String, String),
}

/// Errors surfaced by the framebuffer/renderer collaborator (spec.md §7
/// "render-fatal"). Any error here is fatal at startup.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("framebuffer: {0}")]
    Framebuffer(String),
}

/// Errors surfaced by the input adapter collaborator (spec.md §4.6).
#[derive(Debug, Error)]
pub enum InputError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("no keyboard-capable input device found in /dev/input/event0..9")]
    NoKeyboardFound,
}
