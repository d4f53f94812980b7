//! Multitherm instrument daemon
//!
//! Serves the instrument's text command protocol on a serial port, a TCP
//! socket or stdio. Without a sensor board attached, the channels and relays
//! are backed by the simulation module so the full protocol can be exercised
//! from any terminal.
//!
//! This tool allows users to:
//! - Query calibrated and raw thermocouple and voltage readings.
//! - Switch relays on and off.
//! - Stream readings as CSV or JSON, or watch human-readable diagnostic and
//!   calibration reports.
//!
//! The daemon leverages the `multitherm_lib` crate for the protocol engine and transports.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use multitherm_lib::{
    bank::{Channel, ChannelBank, ChannelGroup, DigitalOutput, Disconnected, RelayBank},
    engine::Engine,
    protocol::ChannelKind,
    simulation::{SimulatedInput, SimulatedRelay},
    tokio_common,
    tokio_serve::{self, SharedEngine},
};
use std::any::Any;
use std::panic;

mod commandline;
mod config;

/// Text carried by a panic, if it is a string.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

/// Starts logging at `level` (overridable through `RUST_LOG`) and routes
/// panics into the log, so a crashed instrument leaves a trace on the host.
fn start_logging(level: LevelFilter) -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str(level.as_str())
        .context("Invalid log specification")?
        .start()
        .context("Cannot start logging")?;

    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|location| location.to_string())
            .unwrap_or_else(|| String::from("<unknown location>"));
        let thread = std::thread::current();
        error!(
            target: "panic",
            "Thread '{}' panicked at {location}: {}",
            thread.name().unwrap_or("<unnamed>"),
            panic_message(info.payload())
        );
    }));
    Ok(handle)
}

/// Builds the channel and relay banks from the configuration.
fn create_banks(config: &config::Config) -> (ChannelBank, RelayBank) {
    let simulation = &config.simulation;

    let temperature = config
        .temperature
        .offsets
        .iter()
        .map(|offset| {
            let input = SimulatedInput::new(
                simulation.ambient,
                simulation.noise,
                simulation.dropout,
            );
            Channel::new(input, *offset)
        })
        .collect();

    if !config.voltage.available {
        warn!("Voltage inputs not available, all voltage readings will report the sentinel");
    }
    let voltage = config
        .voltage
        .offsets
        .iter()
        .map(|offset| {
            if config.voltage.available {
                let input = SimulatedInput::new(
                    simulation.voltage,
                    simulation.noise / 100.0,
                    simulation.dropout,
                );
                Channel::new(input, *offset)
            } else {
                Channel::new(Disconnected, *offset)
            }
        })
        .collect();

    let bank = ChannelBank {
        temperature: ChannelGroup::new(ChannelKind::Temperature, temperature)
            .with_settle_delay(config.temperature.settle_delay),
        voltage: ChannelGroup::new(ChannelKind::Voltage, voltage)
            .with_settle_delay(config.voltage.settle_delay),
    };

    let relays = (1..=config.relays.count)
        .map(|number| Box::new(SimulatedRelay::new(number)) as Box<dyn DigitalOutput>)
        .collect();

    (bank, RelayBank::new(relays))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = start_logging(args.verbose.log_level_filter())?;
    info!(
        "thermd started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let mut config = config::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.startup_mode = mode;
    }
    if let Some(settle_delay) = args.settle_delay {
        config.temperature.settle_delay = settle_delay;
    }
    trace!("Config: {config:?}");

    let (bank, relays) = create_banks(&config);
    let engine = SharedEngine::new(Engine::new(bank, relays, config.settings()));

    match &args.connection {
        commandline::CliConnection::Serial { device, baud_rate } => {
            info!("Opening serial port {device} at {baud_rate} baud");
            let port = tokio_common::open_serial(device, *baud_rate)
                .with_context(|| format!("Cannot open serial port {device}"))?;
            let (reader, writer) = tokio::io::split(port);
            tokio_serve::serve(&engine, reader, writer)
                .await
                .with_context(|| format!("Serving on {device} failed"))?;
        }
        commandline::CliConnection::Tcp { address } => {
            let listener = tokio::net::TcpListener::bind(address)
                .await
                .with_context(|| format!("Cannot listen on {address}"))?;
            info!("Listening on {address}");
            loop {
                let (socket, peer) = listener
                    .accept()
                    .await
                    .with_context(|| "Cannot accept connection")?;
                info!("Host {peer} connected");
                let (reader, writer) = socket.into_split();
                // A broken connection ends that host's session, not the instrument.
                if let Err(error) = tokio_serve::serve(&engine, reader, writer).await {
                    warn!("Connection to {peer} failed: {error}");
                }
            }
        }
        commandline::CliConnection::Stdio => {
            tokio_serve::serve(&engine, tokio::io::stdin(), tokio::io::stdout())
                .await
                .with_context(|| "Serving on stdio failed")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("sensor bus stuck");
        assert_eq!(panic_message(payload.as_ref()), "sensor bus stuck");

        let payload: Box<dyn Any + Send> = Box::new(String::from("relay 3 shorted"));
        assert_eq!(panic_message(payload.as_ref()), "relay 3 shorted");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
