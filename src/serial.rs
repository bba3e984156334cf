// src/serial.rs - Serial port transport for the controller link
use crate::config::Config;
use crate::session::RobotSession;
use serial2_tokio::SerialPort;
use std::path::PathBuf;

/// Open the configured serial port.
pub fn open_port(config: &Config) -> std::io::Result<SerialPort> {
    tracing::info!("Opening {} at {} baud", config.serial.port, config.serial.baud);
    let port = SerialPort::open(&config.serial.port, config.serial.baud).map_err(|e| {
        tracing::error!("Failed to open serial port '{}': {}", config.serial.port, e);
        e
    })?;
    Ok(port)
}

/// Open the configured port and wrap it in a session.
pub fn connect(config: &Config) -> Result<RobotSession<SerialPort>, crate::session::RobotError> {
    let port = open_port(config).map_err(crate::channel::ChannelError::Io)?;
    Ok(RobotSession::new(port, config)?)
}

/// Serial ports present on this machine.
pub fn available_ports() -> std::io::Result<Vec<PathBuf>> {
    SerialPort::available_ports()
}
