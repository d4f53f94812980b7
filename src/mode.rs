//! Operating modes of the instrument.

use std::fmt;
use std::time::Duration;

/// The single active operating mode.
///
/// Exactly one mode is active at any time; switching is a plain assignment,
/// the mode being left has nothing to tear down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Mode {
    /// Query-response: output only in reply to a command.
    #[default]
    Instrument,
    /// Periodic machine-readable push (CSV or JSON).
    Streaming,
    /// Periodic human-readable push.
    Diagnostic,
    /// Periodic raw-reading push with statistics.
    Calibration,
}

impl Mode {
    /// Whether the mode pushes unsolicited reports.
    pub fn is_periodic(&self) -> bool {
        !matches!(self, Mode::Instrument)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Instrument => write!(f, "INSTRUMENT"),
            Mode::Streaming => write!(f, "STREAMING"),
            Mode::Diagnostic => write!(f, "DIAGNOSTIC"),
            Mode::Calibration => write!(f, "CALIBRATION"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "instrument" | "inst" => Ok(Mode::Instrument),
            "streaming" | "stream" => Ok(Mode::Streaming),
            "diagnostic" | "diag" => Ok(Mode::Diagnostic),
            "calibration" | "cal" => Ok(Mode::Calibration),
            other => Err(format!(
                "Unknown mode '{other}', expected one of: instrument, streaming, diagnostic, calibration"
            )),
        }
    }
}

/// Line format used while [`Mode::Streaming`] is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum StreamFormat {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for StreamFormat {
    type Err = crate::protocol::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CSV" => Ok(StreamFormat::Csv),
            "JSON" => Ok(StreamFormat::Json),
            _ => Err(crate::protocol::Error::InvalidStreamFormat),
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Csv => write!(f, "CSV"),
            StreamFormat::Json => write!(f, "JSON"),
        }
    }
}

/// Report cadence of each periodic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub streaming: Duration,
    pub diagnostic: Duration,
    pub calibration: Duration,
}

impl Cadence {
    /// Interval between unsolicited reports in `mode`, `None` for [`Mode::Instrument`].
    pub fn interval(&self, mode: Mode) -> Option<Duration> {
        match mode {
            Mode::Instrument => None,
            Mode::Streaming => Some(self.streaming),
            Mode::Diagnostic => Some(self.diagnostic),
            Mode::Calibration => Some(self.calibration),
        }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            streaming: Duration::from_secs(1),
            diagnostic: Duration::from_secs(2),
            calibration: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_names() {
        assert_eq!("instrument".parse::<Mode>(), Ok(Mode::Instrument));
        assert_eq!("DIAG".parse::<Mode>(), Ok(Mode::Diagnostic));
        assert_eq!("Stream".parse::<Mode>(), Ok(Mode::Streaming));
        assert_eq!("cal".parse::<Mode>(), Ok(Mode::Calibration));
        assert!("labview".parse::<Mode>().is_err());
    }

    #[test]
    fn only_instrument_mode_is_silent() {
        let cadence = Cadence::default();
        assert_eq!(cadence.interval(Mode::Instrument), None);
        assert!(!Mode::Instrument.is_periodic());
        for mode in [Mode::Streaming, Mode::Diagnostic, Mode::Calibration] {
            assert!(mode.is_periodic());
            assert!(cadence.interval(mode).is_some());
        }
    }

    #[test]
    fn diagnostic_is_coarser_than_streaming() {
        let cadence = Cadence::default();
        assert!(cadence.diagnostic > cadence.streaming);
        assert!(cadence.calibration > cadence.streaming);
    }
}
