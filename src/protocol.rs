//! Wire-level types of the instrument protocol.
//!
//! Everything in this module describes what travels over the line: channel
//! kinds and their fixed precisions, the "no reading" sentinel, channel and
//! relay selectors, relay states, the identity string and the protocol error
//! taxonomy. Nothing here touches hardware.

use std::fmt;

/// Numeric literal reported in place of a failed or absent reading.
pub const SENTINEL: f64 = -999.0;

/// Terminator appended to every response line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Prefix of a channel token, e.g. `CH3`.
pub const CHANNEL_PREFIX: &str = "CH";

/// Prefix of a relay token, e.g. `R3`.
pub const RELAY_PREFIX: &str = "R";

/// Token selecting every channel or relay of a bank.
pub const ALL_TOKEN: &str = "ALL";

/// Protocol errors, rendered to the host as `ERROR: <message>`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid channel number (1-{max})")]
    InvalidChannel { max: usize },
    #[error("Invalid relay number (1-{max})")]
    InvalidRelay { max: usize },
    #[error("Invalid relay state (use ON or OFF)")]
    InvalidRelayState,
    #[error("Invalid relay format (use RELAY:SET <Rn|ALL>,<ON|OFF>)")]
    InvalidRelayFormat,
    #[error("Invalid stream format (use CSV or JSON)")]
    InvalidStreamFormat,
    #[error("Unexpected argument")]
    UnexpectedArgument,
    #[error("Unknown command")]
    UnknownCommand,
}

impl Error {
    /// Renders the error as a complete response line.
    pub fn to_response(&self) -> String {
        format!("ERROR: {self}")
    }
}

/// The two kinds of analog input exposed by the channel bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Temperature,
    Voltage,
}

impl ChannelKind {
    /// Fixed number of decimal places on the wire.
    pub const fn precision(&self) -> usize {
        match self {
            ChannelKind::Temperature => 2,
            ChannelKind::Voltage => 4,
        }
    }

    pub const fn unit(&self) -> &'static str {
        match self {
            ChannelKind::Temperature => "°C",
            ChannelKind::Voltage => "V",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Temperature => write!(f, "temperature"),
            ChannelKind::Voltage => write!(f, "voltage"),
        }
    }
}

/// A single reading as it is rendered on the wire.
///
/// `None` (or a non-finite value) renders as [`SENTINEL`] with the kind's
/// precision, so a response line is always well-formed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub kind: ChannelKind,
    pub value: Option<f64>,
}

impl Measurement {
    pub fn new(kind: ChannelKind, value: Option<f64>) -> Self {
        Self { kind, value }
    }

    /// The value that goes on the wire: the reading or the sentinel.
    pub fn wire_value(&self) -> f64 {
        self.value.filter(|v| v.is_finite()).unwrap_or(SENTINEL)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", self.kind.precision(), self.wire_value())
    }
}

/// Joins measurements with commas, in the given order.
pub fn join_measurements<I>(measurements: I) -> String
where
    I: IntoIterator<Item = Measurement>,
{
    measurements
        .into_iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Addresses either every member of a bank or a single 1-based member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    One(usize),
}

impl Selector {
    /// Parses `ALL` or `<prefix><n>` and validates `1 <= n <= count`.
    ///
    /// Anything that is not a plain run of ASCII digits after the prefix is
    /// rejected with `invalid`, it is never read as channel 0.
    fn parse(token: &str, prefix: &str, count: usize, invalid: Error) -> Result<Self, Error> {
        if token == ALL_TOKEN {
            return Ok(Selector::All);
        }
        let digits = token.strip_prefix(prefix).ok_or_else(|| invalid.clone())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid);
        }
        match digits.parse::<usize>() {
            Ok(number) if (1..=count).contains(&number) => Ok(Selector::One(number)),
            _ => Err(invalid),
        }
    }

    /// Parses a channel selector (`ALL` or `CH<n>`) against a bank of `count` channels.
    pub fn parse_channel(token: &str, count: usize) -> Result<Self, Error> {
        Self::parse(
            token,
            CHANNEL_PREFIX,
            count,
            Error::InvalidChannel { max: count },
        )
    }

    /// Parses a relay selector (`ALL` or `R<n>`) against a bank of `count` relays.
    pub fn parse_relay(token: &str, count: usize) -> Result<Self, Error> {
        if token != ALL_TOKEN && !token.starts_with(RELAY_PREFIX) {
            return Err(Error::InvalidRelayFormat);
        }
        Self::parse(
            token,
            RELAY_PREFIX,
            count,
            Error::InvalidRelay { max: count },
        )
    }
}

/// State of a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    On,
    #[default]
    Off,
}

impl RelayState {
    pub fn is_on(&self) -> bool {
        matches!(self, RelayState::On)
    }

    /// Wire encoding used by `RELAY:GET?`.
    pub fn as_bit(&self) -> &'static str {
        if self.is_on() {
            "1"
        } else {
            "0"
        }
    }
}

impl std::str::FromStr for RelayState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(RelayState::On),
            "OFF" => Ok(RelayState::Off),
            _ => Err(Error::InvalidRelayState),
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::On => write!(f, "ON"),
            RelayState::Off => write!(f, "OFF"),
        }
    }
}

/// The identity reported by `*IDN?`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            manufacturer: String::from("MULTITHERM"),
            model: String::from("MT-8TC2V"),
            serial: String::from("SN000001"),
            firmware: String::from(FIRMWARE_VERSION),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.manufacturer, self.model, self.serial, self.firmware
        )
    }
}

/// Firmware version reported by `SYST:VERS?` and the default identity.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
