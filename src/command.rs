//! Parsing of instrument command lines.
//!
//! A line is split into a verb (first whitespace-delimited token) and an
//! argument (the rest). The verb is looked up in a static table that maps
//! it to a small parser building the [`Command`]. Selectors are validated
//! against the bank sizes in [`Limits`] before a command is produced, so
//! the engine only ever dispatches in-range indices.

use crate::bank::Source;
use crate::mode::{Mode, StreamFormat};
use crate::protocol::{ChannelKind, Error, RelayState, Selector};

/// Sizes of the banks a command line is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub temperature: usize,
    pub voltage: usize,
    pub relays: usize,
}

impl Limits {
    pub fn channels(&self, kind: ChannelKind) -> usize {
        match kind {
            ChannelKind::Temperature => self.temperature,
            ChannelKind::Voltage => self.voltage,
        }
    }
}

/// Unit a temperature query is answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

/// Fixed-answer introspection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Error,
    Version,
    ChannelCount(ChannelKind),
    RelayCount,
    UpdateRate,
    Mode,
}

/// A parsed, validated request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `*IDN?`
    Identify,
    /// `*RST`
    Reset,
    /// `MEAS:TEMP?`, `MEAS:TEMP:RAW?`, `MEAS:TEMP:FAHR?`, `MEAS:VOLT?`, `MEAS:VOLT:RAW?`
    Measure {
        kind: ChannelKind,
        selector: Selector,
        source: Source,
        unit: TemperatureUnit,
    },
    /// `MEAS:ALL?`
    MeasureAll,
    /// `CONF:TEMP:OFFS?`, `CONF:VOLT:OFFS?`
    Offsets {
        kind: ChannelKind,
        selector: Selector,
    },
    /// `RELAY:SET`
    SetRelay {
        selector: Selector,
        state: RelayState,
    },
    /// `RELAY:GET?`
    GetRelay { selector: Selector },
    /// `SYST:*?`, `CONF:*?`, `MODE?`
    Query(Query),
    /// `MODE:*`
    SetMode {
        mode: Mode,
        format: Option<StreamFormat>,
    },
    /// Bare mode token such as `CAL` or `CSV`, answered with a banner.
    Alias(Alias),
    /// `DIAG:TEST?`, `DEBUG`, `TEST`
    SensorTest,
    /// `HELP?`, `HELP`, `?`
    Help,
}

/// Bare tokens understood outside the structured command path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alias {
    /// `CAL`
    Calibration,
    /// `CSV`, `LVON`, `LABVIEW`
    Csv,
    /// `JSON`
    Json,
    /// `HUMAN`, `LVOFF`
    Human,
    /// `INST`
    Instrument,
    /// `EXIT`, back to the configured start-up mode.
    Exit,
}

type Parser = fn(&str, &Limits) -> Result<Command, Error>;

const TEMPERATURE: ChannelKind = ChannelKind::Temperature;
const VOLTAGE: ChannelKind = ChannelKind::Voltage;

/// Verb table. Verbs are matched exactly against the upper-cased first token.
const VERBS: &[(&str, Parser)] = &[
    ("*IDN?", |arg, _| bare(arg, Command::Identify)),
    ("*RST", |arg, _| bare(arg, Command::Reset)),
    ("MEAS:TEMP?", |arg, limits| measure(arg, limits, TEMPERATURE, Source::Calibrated)),
    ("MEAS:TEMP:RAW?", |arg, limits| measure(arg, limits, TEMPERATURE, Source::Raw)),
    ("MEAS:TEMP:FAHR?", |arg, limits| {
        measure(arg, limits, TEMPERATURE, Source::Calibrated).map(in_fahrenheit)
    }),
    ("MEAS:VOLT?", |arg, limits| measure(arg, limits, VOLTAGE, Source::Calibrated)),
    ("MEAS:VOLT:RAW?", |arg, limits| measure(arg, limits, VOLTAGE, Source::Raw)),
    ("MEAS:ALL?", |arg, _| bare(arg, Command::MeasureAll)),
    ("RELAY:SET", set_relay),
    ("RELAY:GET?", |arg, limits| {
        Ok(Command::GetRelay {
            selector: Selector::parse_relay(arg, limits.relays)?,
        })
    }),
    ("SYST:ERR?", |arg, _| bare(arg, Command::Query(Query::Error))),
    ("SYST:VERS?", |arg, _| bare(arg, Command::Query(Query::Version))),
    ("CONF:TEMP:COUNT?", |arg, _| {
        bare(arg, Command::Query(Query::ChannelCount(TEMPERATURE)))
    }),
    ("CONF:VOLT:COUNT?", |arg, _| {
        bare(arg, Command::Query(Query::ChannelCount(VOLTAGE)))
    }),
    ("CONF:RELAY:COUNT?", |arg, _| bare(arg, Command::Query(Query::RelayCount))),
    ("CONF:RATE?", |arg, _| bare(arg, Command::Query(Query::UpdateRate))),
    ("CONF:TEMP:OFFS?", |arg, limits| offsets(arg, limits, TEMPERATURE)),
    ("CONF:VOLT:OFFS?", |arg, limits| offsets(arg, limits, VOLTAGE)),
    ("MODE?", |arg, _| bare(arg, Command::Query(Query::Mode))),
    ("MODE:INST", |arg, _| bare(arg, set_mode(Mode::Instrument, None))),
    ("MODE:STREAM", |arg, _| {
        let format = if arg.is_empty() {
            StreamFormat::Csv
        } else {
            arg.parse()?
        };
        Ok(set_mode(Mode::Streaming, Some(format)))
    }),
    ("MODE:DIAG", |arg, _| bare(arg, set_mode(Mode::Diagnostic, None))),
    ("MODE:CAL", |arg, _| bare(arg, set_mode(Mode::Calibration, None))),
    ("DIAG:TEST?", |arg, _| bare(arg, Command::SensorTest)),
    ("HELP?", |arg, _| bare(arg, Command::Help)),
    ("HELP", |arg, _| bare(arg, Command::Help)),
    ("?", |arg, _| bare(arg, Command::Help)),
];

/// Bare-token table. These only match when the whole line is the token.
const ALIASES: &[(&str, Command)] = &[
    ("CAL", Command::Alias(Alias::Calibration)),
    ("CSV", Command::Alias(Alias::Csv)),
    ("LVON", Command::Alias(Alias::Csv)),
    ("LABVIEW", Command::Alias(Alias::Csv)),
    ("JSON", Command::Alias(Alias::Json)),
    ("HUMAN", Command::Alias(Alias::Human)),
    ("LVOFF", Command::Alias(Alias::Human)),
    ("INST", Command::Alias(Alias::Instrument)),
    ("EXIT", Command::Alias(Alias::Exit)),
    ("DEBUG", Command::SensorTest),
    ("TEST", Command::SensorTest),
];

/// Accepts a verb that takes no argument.
fn bare(arg: &str, command: Command) -> Result<Command, Error> {
    if arg.is_empty() {
        Ok(command)
    } else {
        Err(Error::UnexpectedArgument)
    }
}

fn measure(
    arg: &str,
    limits: &Limits,
    kind: ChannelKind,
    source: Source,
) -> Result<Command, Error> {
    Ok(Command::Measure {
        kind,
        selector: channel_selector(arg, limits.channels(kind))?,
        source,
        unit: TemperatureUnit::Celsius,
    })
}

fn in_fahrenheit(command: Command) -> Command {
    match command {
        Command::Measure {
            kind,
            selector,
            source,
            ..
        } => Command::Measure {
            kind,
            selector,
            source,
            unit: TemperatureUnit::Fahrenheit,
        },
        other => other,
    }
}

fn offsets(arg: &str, limits: &Limits, kind: ChannelKind) -> Result<Command, Error> {
    Ok(Command::Offsets {
        kind,
        selector: channel_selector(arg, limits.channels(kind))?,
    })
}

/// A missing selector means every channel.
fn channel_selector(arg: &str, count: usize) -> Result<Selector, Error> {
    if arg.is_empty() {
        Ok(Selector::All)
    } else {
        Selector::parse_channel(arg, count)
    }
}

fn set_relay(arg: &str, limits: &Limits) -> Result<Command, Error> {
    let (selector, state) = arg.split_once(',').ok_or(Error::InvalidRelayFormat)?;
    let (selector, state) = (selector.trim(), state.trim());
    if selector.is_empty() || state.is_empty() {
        return Err(Error::InvalidRelayFormat);
    }
    Ok(Command::SetRelay {
        selector: Selector::parse_relay(selector, limits.relays)?,
        state: state.parse()?,
    })
}

fn set_mode(mode: Mode, format: Option<StreamFormat>) -> Command {
    Command::SetMode { mode, format }
}

impl Command {
    /// Parses a trimmed, upper-cased command line.
    pub fn parse(line: &str, limits: &Limits) -> Result<Self, Error> {
        if let Some((_, command)) = ALIASES.iter().find(|(token, _)| *token == line) {
            return Ok(*command);
        }

        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        VERBS
            .iter()
            .find(|(name, _)| *name == verb)
            .ok_or(Error::UnknownCommand)
            .and_then(|(_, parse)| parse(arg, limits))
    }
}

/// Every verb understood by [`Command::parse`], in table order.
pub fn verbs() -> impl Iterator<Item = &'static str> {
    VERBS.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const LIMITS: Limits = Limits {
        temperature: 8,
        voltage: 2,
        relays: 8,
    };

    fn parse(line: &str) -> Result<Command, Error> {
        Command::parse(line, &LIMITS)
    }

    #[test]
    fn identification() {
        assert_matches!(parse("*IDN?"), Ok(Command::Identify));
        assert_matches!(parse("*RST"), Ok(Command::Reset));
    }

    #[test]
    fn measurement_queries() {
        assert_matches!(
            parse("MEAS:TEMP? ALL"),
            Ok(Command::Measure {
                kind: ChannelKind::Temperature,
                selector: Selector::All,
                source: Source::Calibrated,
                unit: TemperatureUnit::Celsius,
            })
        );
        assert_matches!(
            parse("MEAS:TEMP:RAW? CH4"),
            Ok(Command::Measure {
                selector: Selector::One(4),
                source: Source::Raw,
                ..
            })
        );
        assert_matches!(
            parse("MEAS:TEMP:FAHR? CH1"),
            Ok(Command::Measure {
                unit: TemperatureUnit::Fahrenheit,
                ..
            })
        );
        assert_matches!(
            parse("MEAS:VOLT? CH2"),
            Ok(Command::Measure {
                kind: ChannelKind::Voltage,
                selector: Selector::One(2),
                ..
            })
        );
        assert_matches!(
            parse("MEAS:TEMP?"),
            Ok(Command::Measure {
                selector: Selector::All,
                ..
            })
        );
        assert_matches!(parse("MEAS:ALL?"), Ok(Command::MeasureAll));
    }

    #[test]
    fn channel_ranges_follow_kind() {
        assert_matches!(
            parse("MEAS:TEMP? CH9"),
            Err(Error::InvalidChannel { max: 8 })
        );
        assert_matches!(
            parse("MEAS:VOLT? CH3"),
            Err(Error::InvalidChannel { max: 2 })
        );
        assert_matches!(
            parse("MEAS:TEMP? CH0"),
            Err(Error::InvalidChannel { max: 8 })
        );
        for n in 1..=8 {
            assert!(parse(&format!("MEAS:TEMP? CH{n}")).is_ok());
        }
    }

    #[test]
    fn relay_commands() {
        assert_matches!(
            parse("RELAY:SET R3,ON"),
            Ok(Command::SetRelay {
                selector: Selector::One(3),
                state: RelayState::On,
            })
        );
        assert_matches!(
            parse("RELAY:SET ALL, OFF"),
            Ok(Command::SetRelay {
                selector: Selector::All,
                state: RelayState::Off,
            })
        );
        assert_matches!(
            parse("RELAY:GET? R8"),
            Ok(Command::GetRelay {
                selector: Selector::One(8)
            })
        );
        assert_matches!(parse("RELAY:SET R9,ON"), Err(Error::InvalidRelay { max: 8 }));
        assert_matches!(parse("RELAY:SET R3,MAYBE"), Err(Error::InvalidRelayState));
        assert_matches!(parse("RELAY:SET R3"), Err(Error::InvalidRelayFormat));
        assert_matches!(parse("RELAY:SET ,ON"), Err(Error::InvalidRelayFormat));
        assert_matches!(parse("RELAY:SET"), Err(Error::InvalidRelayFormat));
        assert_matches!(parse("RELAY:GET? X1"), Err(Error::InvalidRelayFormat));
    }

    #[test]
    fn mode_commands() {
        assert_matches!(
            parse("MODE:STREAM"),
            Ok(Command::SetMode {
                mode: Mode::Streaming,
                format: Some(StreamFormat::Csv),
            })
        );
        assert_matches!(
            parse("MODE:STREAM JSON"),
            Ok(Command::SetMode {
                format: Some(StreamFormat::Json),
                ..
            })
        );
        assert_matches!(parse("MODE:STREAM XML"), Err(Error::InvalidStreamFormat));
        assert_matches!(
            parse("MODE:CAL"),
            Ok(Command::SetMode {
                mode: Mode::Calibration,
                format: None,
            })
        );
        assert_matches!(parse("MODE?"), Ok(Command::Query(Query::Mode)));
    }

    #[test]
    fn argumentless_verbs_reject_trailing_text() {
        assert_matches!(parse("*RST GARBAGE"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("*IDN? 1"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("MEAS:ALL? CH9"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("MODE:CAL NOW"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("MODE:INST X"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("MODE? X"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("CONF:RATE? 5"), Err(Error::UnexpectedArgument));
        assert_matches!(parse("HELP ME"), Err(Error::UnexpectedArgument));
        // Whitespace after the verb is not an argument.
        assert_matches!(parse("*RST   "), Ok(Command::Reset));
        for verb in ["*IDN?", "MEAS:ALL?", "SYST:ERR?", "MODE:DIAG", "DIAG:TEST?", "?"] {
            assert_matches!(
                parse(&format!("{verb} EXTRA")),
                Err(Error::UnexpectedArgument)
            );
        }
    }

    #[test]
    fn bare_aliases() {
        assert_matches!(parse("CAL"), Ok(Command::Alias(Alias::Calibration)));
        assert_matches!(parse("LABVIEW"), Ok(Command::Alias(Alias::Csv)));
        assert_matches!(parse("LVOFF"), Ok(Command::Alias(Alias::Human)));
        assert_matches!(parse("EXIT"), Ok(Command::Alias(Alias::Exit)));
        assert_matches!(parse("TEST"), Ok(Command::SensorTest));
        assert_matches!(parse("DEBUG"), Ok(Command::SensorTest));
        // Aliases only match whole lines.
        assert_matches!(parse("CAL NOW"), Err(Error::UnknownCommand));
    }

    #[test]
    fn help_and_unknown() {
        assert_matches!(parse("?"), Ok(Command::Help));
        assert_matches!(parse("HELP?"), Ok(Command::Help));
        assert_matches!(parse("FOO"), Err(Error::UnknownCommand));
        // No prefix guessing.
        assert_matches!(parse("MEAS:TEMP"), Err(Error::UnknownCommand));
        assert_matches!(parse("MEAS"), Err(Error::UnknownCommand));
    }

    #[test]
    fn verb_table_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for verb in verbs() {
            assert!(seen.insert(verb), "duplicate verb {verb}");
        }
        for (token, _) in ALIASES {
            assert!(!seen.contains(token), "alias {token} shadows a verb");
        }
    }
}
