//! A library implementing a multi-channel thermocouple and voltage instrument.
//!
//! The instrument speaks a line-oriented, SCPI-like text protocol: a host sends
//! commands such as `MEAS:TEMP? CH1` or `RELAY:SET R2,ON` and receives one
//! CR LF terminated response per command. Besides answering queries, the
//! instrument can push periodic reports in one of several modes.
//!
//! The crate is split in two layers:
//!
//! 1.  **Protocol Engine**: [`engine::Engine`] owns the channel and relay banks
//!     and the mode state machine. It is purely synchronous and transport
//!     agnostic: feed it lines, get responses back. See [`command`] for the
//!     vocabulary and [`report`] for the periodic output formats.
//!
//! 2.  **Transports**: [`tokio_serve::serve`] drives an engine over any async
//!     byte stream (serial port, TCP socket, stdio), interleaving host commands
//!     with the periodic output of the active mode.
//!
//! ## Features
//!
//! - **Calibrated Channels**: Per-channel offsets, raw and Fahrenheit variants.
//! - **Sentinel Values**: A failed read is reported as `-999.00` (temperature) or
//!   `-999.0000` (voltage) instead of aborting the command.
//! - **Relay Control**: Individually addressable digital outputs, all off at start-up.
//! - **Output Modes**: Instrument (query only), Streaming (CSV or JSON),
//!   Diagnostic (human readable) and Calibration (raw readings with statistics).
//! - **Strongly-Typed API**: Commands, selectors and modes are enums, so an
//!   accepted line is always a valid instruction.
//!
//! ## Quick Start
//!
//! ```
//! use multitherm_lib::{
//!     bank::{Channel, ChannelBank, DigitalOutput, RelayBank},
//!     engine::{Engine, Settings},
//!     protocol::RelayState,
//! };
//!
//! let temperatures = vec![Channel::new(|| Some(21.5), -0.25), Channel::new(|| None::<f64>, 0.0)];
//! let voltages = vec![Channel::new(|| Some(3.3), 0.0)];
//! let relays: Vec<Box<dyn DigitalOutput>> = vec![Box::new(|_: RelayState| {})];
//!
//! let mut engine = Engine::new(
//!     ChannelBank::new(temperatures, voltages),
//!     RelayBank::new(relays),
//!     Settings::default(),
//! );
//!
//! assert_eq!(engine.handle_line("MEAS:TEMP? ALL").unwrap(), "21.25,-999.00");
//! assert_eq!(engine.handle_line("MEAS:VOLT? CH1").unwrap(), "3.3000");
//! assert_eq!(engine.handle_line("RELAY:SET R1,ON").unwrap(), "OK");
//! assert_eq!(engine.handle_line("MEAS:TEMP? CH5").unwrap(), "ERROR: Invalid channel number (1-2)");
//! ```

pub mod bank;
pub mod calibration;
pub mod command;
pub mod engine;
pub mod mode;
pub mod protocol;
pub mod report;
pub mod transport;

#[cfg_attr(docsrs, doc(cfg(feature = "simulation")))]
#[cfg(feature = "simulation")]
pub mod simulation;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-serve")))]
#[cfg(feature = "tokio-serve")]
pub mod tokio_common;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-serve")))]
#[cfg(feature = "tokio-serve")]
pub mod tokio_serve;
