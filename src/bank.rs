//! The channel bank and the relay bank.
//!
//! Hardware is reached through two small traits: [`Sensor`] produces one raw
//! reading (or none) per call and [`DigitalOutput`] drives one relay line.
//! The banks own the per-channel records (offsets, relay states) and address
//! them by 1-based number.

use crate::calibration::calibrate;
use crate::protocol::{ChannelKind, Measurement, RelayState, Selector};
use log::*;
use std::time::{Duration, Instant};

/// One raw acquisition source, e.g. a thermocouple amplifier or an ADC input.
///
/// Implementations must return within a bounded time; a read that cannot
/// complete returns `None`.
pub trait Sensor: Send {
    fn read(&mut self) -> Option<f64>;
}

impl<F> Sensor for F
where
    F: FnMut() -> Option<f64> + Send,
{
    fn read(&mut self) -> Option<f64> {
        self()
    }
}

/// A sensor that never produces a reading.
///
/// Stands in for a subsystem that was not detected at start-up, so every
/// query on it reports the sentinel.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

impl Sensor for Disconnected {
    fn read(&mut self) -> Option<f64> {
        None
    }
}

/// Where a reading comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Raw reading plus the channel's offset.
    Calibrated,
    /// Raw reading, offset bypassed.
    Raw,
}

/// A single addressable input with its fixed calibration offset.
pub struct Channel {
    offset: f64,
    sensor: Box<dyn Sensor>,
}

impl Channel {
    pub fn new(sensor: impl Sensor + 'static, offset: f64) -> Self {
        Self {
            offset,
            sensor: Box::new(sensor),
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Acquires a fresh raw reading. Non-finite values count as failures.
    pub fn read_raw(&mut self) -> Option<f64> {
        self.sensor.read().filter(|v| v.is_finite())
    }

    pub fn read(&mut self, source: Source) -> Option<f64> {
        match source {
            Source::Raw => self.read_raw(),
            Source::Calibrated => calibrate(self.read_raw(), self.offset),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// All channels of one kind sharing one bus.
///
/// Any two reads on the bus are spaced by at least `settle_delay`, whether
/// they belong to one sweep or to separate commands.
#[derive(Debug)]
pub struct ChannelGroup {
    kind: ChannelKind,
    channels: Vec<Channel>,
    settle_delay: Duration,
    last_read: Option<Instant>,
}

impl ChannelGroup {
    pub fn new(kind: ChannelKind, channels: Vec<Channel>) -> Self {
        Self {
            kind,
            channels,
            settle_delay: Duration::ZERO,
            last_read: None,
        }
    }

    /// Sets the minimum spacing between two consecutive reads on this bus.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Calibration offsets in channel order.
    pub fn offsets(&self) -> Vec<f64> {
        self.channels.iter().map(Channel::offset).collect()
    }

    /// Blocks until the bus has been quiet for `settle_delay`.
    fn settle(&self) {
        if let Some(last) = self.last_read {
            let remaining = self.settle_delay.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                std::thread::sleep(remaining);
            }
        }
    }

    /// Reads channel `number` (1-based). Out-of-range numbers yield `None`
    /// without touching the bus; callers validate selectors before they get here.
    pub fn read(&mut self, number: usize, source: Source) -> Option<f64> {
        let index = number.wrapping_sub(1);
        if index >= self.channels.len() {
            return None;
        }
        self.settle();
        let value = self.channels[index].read(source);
        self.last_read = Some(Instant::now());
        trace!("{} channel {number} ({source:?}): {value:?}", self.kind);
        value
    }

    /// Reads every channel in order.
    pub fn read_all(&mut self, source: Source) -> Vec<Option<f64>> {
        (1..=self.channels.len())
            .map(|number| self.read(number, source))
            .collect()
    }

    /// Reads the selected channel(s) as wire measurements.
    pub fn measure(&mut self, selector: Selector, source: Source) -> Vec<Measurement> {
        let kind = self.kind;
        match selector {
            Selector::All => self
                .read_all(source)
                .into_iter()
                .map(|value| Measurement::new(kind, value))
                .collect(),
            Selector::One(number) => vec![Measurement::new(kind, self.read(number, source))],
        }
    }
}

/// Temperature and voltage channel groups.
#[derive(Debug)]
pub struct ChannelBank {
    pub temperature: ChannelGroup,
    pub voltage: ChannelGroup,
}

impl ChannelBank {
    pub fn new(temperature: Vec<Channel>, voltage: Vec<Channel>) -> Self {
        Self {
            temperature: ChannelGroup::new(ChannelKind::Temperature, temperature),
            voltage: ChannelGroup::new(ChannelKind::Voltage, voltage),
        }
    }

    pub fn group(&self, kind: ChannelKind) -> &ChannelGroup {
        match kind {
            ChannelKind::Temperature => &self.temperature,
            ChannelKind::Voltage => &self.voltage,
        }
    }

    pub fn group_mut(&mut self, kind: ChannelKind) -> &mut ChannelGroup {
        match kind {
            ChannelKind::Temperature => &mut self.temperature,
            ChannelKind::Voltage => &mut self.voltage,
        }
    }

    pub fn count(&self, kind: ChannelKind) -> usize {
        self.group(kind).len()
    }
}

/// One relay line.
pub trait DigitalOutput: Send {
    fn write(&mut self, state: RelayState);
}

impl<F> DigitalOutput for F
where
    F: FnMut(RelayState) + Send,
{
    fn write(&mut self, state: RelayState) {
        self(state)
    }
}

struct Relay {
    state: RelayState,
    output: Box<dyn DigitalOutput>,
}

/// Relay outputs addressed by 1-based number.
///
/// The bank is the source of truth for relay state; a state persists until
/// the next explicit set.
pub struct RelayBank {
    relays: Vec<Relay>,
}

impl RelayBank {
    /// Creates the bank and drives every output to [`RelayState::Off`].
    pub fn new(outputs: Vec<Box<dyn DigitalOutput>>) -> Self {
        let relays = outputs
            .into_iter()
            .map(|mut output| {
                output.write(RelayState::Off);
                Relay {
                    state: RelayState::Off,
                    output,
                }
            })
            .collect();
        Self { relays }
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Sets the selected relay(s). Out-of-range numbers are ignored.
    pub fn set(&mut self, selector: Selector, state: RelayState) {
        match selector {
            Selector::All => {
                for relay in &mut self.relays {
                    relay.output.write(state);
                    relay.state = state;
                }
            }
            Selector::One(number) => {
                if let Some(relay) = self.relays.get_mut(number.wrapping_sub(1)) {
                    relay.output.write(state);
                    relay.state = state;
                }
            }
        }
        debug!("Relay {selector:?} set to {state}");
    }

    /// States of the selected relay(s) in relay order.
    pub fn get(&self, selector: Selector) -> Vec<RelayState> {
        match selector {
            Selector::All => self.relays.iter().map(|r| r.state).collect(),
            Selector::One(number) => self
                .relays
                .get(number.wrapping_sub(1))
                .map(|r| r.state)
                .into_iter()
                .collect(),
        }
    }
}

impl std::fmt::Debug for RelayBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.relays.iter().map(|r| r.state))
            .finish()
    }
}
