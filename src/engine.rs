//! The command protocol engine and mode state machine.
//!
//! [`Engine`] owns all mutable instrument state: the channel bank, the relay
//! bank and the active [`Mode`]. The transport feeds it one line at a time
//! through [`Engine::handle_line`] and, while a periodic mode is active,
//! asks for [`Engine::periodic_report`] every [`Engine::output_interval`].
//! Neither call ever fails; protocol errors become `ERROR: ...` responses
//! and failed reads become sentinels.

use crate::bank::{ChannelBank, RelayBank, Source};
use crate::calibration::celsius_to_fahrenheit;
use crate::command::{Alias, Command, Limits, Query, TemperatureUnit};
use crate::mode::{Cadence, Mode, StreamFormat};
use crate::protocol::{
    join_measurements, ChannelKind, Identity, Measurement, Selector, FIRMWARE_VERSION,
};
use crate::report;
use log::*;
use std::time::Duration;

/// Static engine configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    pub identity: Identity,
    /// Mode entered at start-up and by `EXIT`.
    pub startup_mode: Mode,
    /// Stream format used until a command selects another one.
    pub stream_format: StreamFormat,
    pub cadence: Cadence,
}

/// Single-owner instrument state machine.
#[derive(Debug)]
pub struct Engine {
    bank: ChannelBank,
    relays: RelayBank,
    settings: Settings,
    mode: Mode,
    stream_format: StreamFormat,
}

const OK: &str = "OK";

impl Engine {
    pub fn new(bank: ChannelBank, relays: RelayBank, settings: Settings) -> Self {
        info!(
            "Engine ready: {} temperature, {} voltage channels, {} relays, start-up mode {}",
            bank.temperature.len(),
            bank.voltage.len(),
            relays.len(),
            settings.startup_mode
        );
        Self {
            bank,
            relays,
            mode: settings.startup_mode,
            stream_format: settings.stream_format,
            settings,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn stream_format(&self) -> StreamFormat {
        self.stream_format
    }

    pub fn limits(&self) -> Limits {
        Limits {
            temperature: self.bank.count(ChannelKind::Temperature),
            voltage: self.bank.count(ChannelKind::Voltage),
            relays: self.relays.len(),
        }
    }

    /// Interval between unsolicited reports, `None` in instrument mode.
    pub fn output_interval(&self) -> Option<Duration> {
        self.settings.cadence.interval(self.mode)
    }

    fn enter(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("Mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Processes one raw input line and returns the response, if any.
    ///
    /// Blank lines produce no response. Everything else produces exactly
    /// one response, which may span several CR LF separated lines.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let line = line.to_ascii_uppercase();
        debug!("<- {line}");

        let response = match Command::parse(&line, &self.limits()) {
            Ok(command) => self.execute(command),
            Err(err) => {
                debug!("Rejected '{line}': {err}");
                err.to_response()
            }
        };
        trace!("-> {response}");
        Some(response)
    }

    /// Runs a parsed command against the instrument state.
    pub fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Identify => self.settings.identity.to_string(),
            Command::Reset => {
                self.enter(Mode::Instrument);
                OK.to_string()
            }
            Command::Measure {
                kind,
                selector,
                source,
                unit,
            } => {
                let mut measurements = self.bank.group_mut(kind).measure(selector, source);
                if unit == TemperatureUnit::Fahrenheit {
                    for m in &mut measurements {
                        m.value = celsius_to_fahrenheit(m.value);
                    }
                }
                join_measurements(measurements)
            }
            Command::MeasureAll => {
                let temperatures = self
                    .bank
                    .temperature
                    .measure(Selector::All, Source::Calibrated);
                let voltages = self.bank.voltage.measure(Selector::All, Source::Calibrated);
                join_measurements(temperatures.into_iter().chain(voltages))
            }
            Command::Offsets { kind, selector } => {
                let offsets = self.bank.group(kind).offsets();
                let selected = match selector {
                    Selector::All => offsets,
                    Selector::One(number) => offsets
                        .get(number.wrapping_sub(1))
                        .copied()
                        .into_iter()
                        .collect(),
                };
                join_measurements(
                    selected
                        .into_iter()
                        .map(|offset| Measurement::new(kind, Some(offset))),
                )
            }
            Command::SetRelay { selector, state } => {
                self.relays.set(selector, state);
                OK.to_string()
            }
            Command::GetRelay { selector } => self
                .relays
                .get(selector)
                .iter()
                .map(|state| state.as_bit())
                .collect::<Vec<_>>()
                .join(","),
            Command::Query(query) => self.query(query),
            Command::SetMode { mode, format } => {
                if let Some(format) = format {
                    self.stream_format = format;
                }
                self.enter(mode);
                OK.to_string()
            }
            Command::Alias(alias) => self.alias(alias),
            Command::SensorTest => {
                let temperatures = self.bank.temperature.read_all(Source::Calibrated);
                let voltages = self.bank.voltage.read_all(Source::Calibrated);
                report::sensor_test_report(&temperatures, &voltages)
            }
            Command::Help => report::HELP.to_string(),
        }
    }

    fn query(&self, query: Query) -> String {
        match query {
            Query::Error => String::from("0,\"No error\""),
            Query::Version => FIRMWARE_VERSION.to_string(),
            Query::ChannelCount(kind) => self.bank.count(kind).to_string(),
            Query::RelayCount => self.relays.len().to_string(),
            Query::UpdateRate => {
                let period = self.settings.cadence.streaming.as_secs_f64();
                let rate = if period > 0.0 { 1.0 / period } else { 0.0 };
                format!("{rate:.2}")
            }
            Query::Mode => self.mode.to_string(),
        }
    }

    fn alias(&mut self, alias: Alias) -> String {
        match alias {
            Alias::Calibration => {
                self.enter(Mode::Calibration);
                report::calibration_banner()
            }
            Alias::Csv => {
                self.stream_format = StreamFormat::Csv;
                self.enter(Mode::Streaming);
                report::csv_banner(self.bank.temperature.len(), self.bank.voltage.len())
            }
            Alias::Json => {
                self.stream_format = StreamFormat::Json;
                self.enter(Mode::Streaming);
                report::JSON_BANNER.to_string()
            }
            Alias::Human => {
                self.enter(Mode::Diagnostic);
                report::HUMAN_BANNER.to_string()
            }
            Alias::Instrument => {
                self.enter(Mode::Instrument);
                report::INSTRUMENT_BANNER.to_string()
            }
            Alias::Exit => {
                let mode = self.settings.startup_mode;
                self.enter(mode);
                format!("Exiting current mode - returning to {mode}")
            }
        }
    }

    /// Produces the unsolicited report of the active mode.
    ///
    /// Returns `None` in instrument mode, which never pushes output.
    pub fn periodic_report(&mut self) -> Option<String> {
        match self.mode {
            Mode::Instrument => None,
            Mode::Streaming => {
                let temperatures = self.bank.temperature.read_all(Source::Calibrated);
                let voltages = self.bank.voltage.read_all(Source::Calibrated);
                match self.stream_format {
                    StreamFormat::Csv => Some(report::csv_line(&temperatures, &voltages)),
                    StreamFormat::Json => match report::json_line(&temperatures, &voltages) {
                        Ok(line) => Some(line),
                        Err(err) => {
                            error!("Cannot render JSON report: {err}");
                            None
                        }
                    },
                }
            }
            Mode::Diagnostic => {
                let temperatures = self.bank.temperature.read_all(Source::Calibrated);
                let voltages = self.bank.voltage.read_all(Source::Calibrated);
                Some(report::diagnostic_report(&temperatures, &voltages))
            }
            Mode::Calibration => {
                let raw = self.bank.temperature.read_all(Source::Raw);
                Some(report::calibration_report(&raw))
            }
        }
    }
}
