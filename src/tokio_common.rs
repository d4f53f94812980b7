//! This module provides common data structures and error types for the `tokio`
//! based transports.
//!
//! It defines the `Error` enum, which encapsulates all possible transport errors.

/// Represents all possible errors that can occur while serving a host.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Reading from or writing to the host failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running the engine panicked or was cancelled.
    #[error("Engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The serial port could not be opened or configured.
    #[cfg(feature = "tokio-serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}

/// The result type for tokio operations.
pub type Result<T> = std::result::Result<T, crate::tokio_common::Error>;

/// The parity used for serial communication.
#[cfg(feature = "tokio-serial")]
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
#[cfg(feature = "tokio-serial")]
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
#[cfg(feature = "tokio-serial")]
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Default baud rate of the instrument's serial link.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Creates a `tokio_serial::SerialPortBuilder` with the specified settings.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `baud_rate` - The baud rate for the serial communication.
#[cfg(feature = "tokio-serial")]
pub fn serial_port_builder(device: &str, baud_rate: u32) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, baud_rate)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}

/// Opens `device` as an async serial stream, 8N1 without flow control.
#[cfg(feature = "tokio-serial")]
pub fn open_serial(device: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    Ok(tokio_serial::SerialStream::open(&serial_port_builder(
        device, baud_rate,
    ))?)
}
