//! Rendering of periodic reports, banners and help text.
//!
//! Machine-readable lines (CSV, JSON) always carry every channel with the
//! kind's fixed precision and the sentinel for failed reads. The
//! human-readable reports spell failures out instead.

use crate::calibration::{celsius_to_fahrenheit, Statistics};
use crate::protocol::{join_measurements, ChannelKind, Measurement, LINE_TERMINATOR};
use serde_json::{Map, Number, Value};

const TEMPERATURE: ChannelKind = ChannelKind::Temperature;
const VOLTAGE: ChannelKind = ChannelKind::Voltage;

/// Joins report lines with the protocol line terminator.
fn lines(lines: Vec<String>) -> String {
    lines.join(LINE_TERMINATOR)
}

fn measurements(kind: ChannelKind, values: &[Option<f64>]) -> Vec<Measurement> {
    values.iter().map(|v| Measurement::new(kind, *v)).collect()
}

/// `t1,...,tN,v1,...,vM`, calibrated values.
pub fn csv_line(temperatures: &[Option<f64>], voltages: &[Option<f64>]) -> String {
    join_measurements(
        measurements(TEMPERATURE, temperatures)
            .into_iter()
            .chain(measurements(VOLTAGE, voltages)),
    )
}

/// Header describing the columns of [`csv_line`].
pub fn csv_header(temperatures: usize, voltages: usize) -> String {
    (1..=temperatures)
        .map(|n| format!("S{n}_C"))
        .chain((1..=voltages).map(|n| format!("V{n}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// A fixed-decimal JSON number, keeping the wire precision of the measurement.
fn number(measurement: Measurement) -> serde_json::Result<Value> {
    serde_json::from_str::<Number>(&measurement.to_string()).map(Value::Number)
}

/// One JSON object per line, keyed `sensorN` / `voltageN` in channel order.
pub fn json_line(
    temperatures: &[Option<f64>],
    voltages: &[Option<f64>],
) -> serde_json::Result<String> {
    let mut object = Map::new();
    for (i, celsius) in temperatures.iter().enumerate() {
        let fahrenheit = celsius_to_fahrenheit(*celsius);
        let mut channel = Map::new();
        channel.insert(
            "celsius".into(),
            number(Measurement::new(TEMPERATURE, *celsius))?,
        );
        channel.insert(
            "fahrenheit".into(),
            number(Measurement::new(TEMPERATURE, fahrenheit))?,
        );
        object.insert(format!("sensor{}", i + 1), Value::Object(channel));
    }
    for (i, volts) in voltages.iter().enumerate() {
        let mut channel = Map::new();
        channel.insert("volts".into(), number(Measurement::new(VOLTAGE, *volts))?);
        object.insert(format!("voltage{}", i + 1), Value::Object(channel));
    }
    serde_json::to_string(&Value::Object(object))
}

/// Human-readable calibrated readings.
pub fn diagnostic_report(temperatures: &[Option<f64>], voltages: &[Option<f64>]) -> String {
    let mut out = vec![String::from("=== CALIBRATED Temperature Readings ===")];
    for (i, celsius) in temperatures.iter().enumerate() {
        let n = i + 1;
        out.push(match (celsius, celsius_to_fahrenheit(*celsius)) {
            (Some(c), Some(f)) => format!("Sensor {n}: {c:.2}°C / {f:.2}°F"),
            _ => format!("Sensor {n}: Error reading thermocouple!"),
        });
    }
    for (i, volts) in voltages.iter().enumerate() {
        let n = i + 1;
        out.push(match volts {
            Some(v) => format!("Voltage {n}: {v:.4}V"),
            None => format!("Voltage {n}: Error reading voltage input!"),
        });
    }
    out.push(String::new());
    lines(out)
}

/// Raw readings with their mean and per-channel deviation.
///
/// The average and deviation block is left out when no channel produced a
/// reading.
pub fn calibration_report(raw_temperatures: &[Option<f64>]) -> String {
    let mut out = vec![String::from("=== CALIBRATION READINGS (RAW) ===")];
    for (i, raw) in raw_temperatures.iter().enumerate() {
        let n = i + 1;
        out.push(match raw {
            Some(t) => format!("Sensor {n} RAW: {t:.2}°C"),
            None => format!("Sensor {n} RAW: ERROR"),
        });
    }

    let stats = Statistics::from_readings(raw_temperatures);
    if let Some(mean) = stats.mean {
        out.push(format!("Average: {mean:.2}°C"));
        out.push(String::new());
        out.push(String::from("Differences from average:"));
        for (n, deviation) in stats.deviations {
            out.push(format!("Sensor {n}: {deviation:.2}°C"));
        }
    }
    out.push(String::from("====================================="));
    out.push(String::new());
    lines(out)
}

/// One-shot sweep over every channel, calibrated.
pub fn sensor_test_report(temperatures: &[Option<f64>], voltages: &[Option<f64>]) -> String {
    let mut out = vec![String::from("=== INDIVIDUAL SENSOR TEST ===")];
    let kinds = [(TEMPERATURE, "Sensor", temperatures), (VOLTAGE, "Voltage", voltages)];
    for (kind, label, values) in kinds {
        for (i, value) in values.iter().enumerate() {
            let n = i + 1;
            out.push(match value {
                Some(v) => format!(
                    "{label} {n}: {v:.prec$}{unit}",
                    prec = kind.precision(),
                    unit = kind.unit()
                ),
                None => format!("{label} {n}: ERROR"),
            });
        }
    }
    out.push(String::from("==================================="));
    lines(out)
}

/// Printed when calibration mode is entered through the bare `CAL` token.
pub fn calibration_banner() -> String {
    lines(
        [
            "========== CALIBRATION MODE ==========",
            "Instructions:",
            "1. Place ALL sensors in the same reference environment",
            "2. Use ice water (0°C) or boiling water (100°C) for reference",
            "3. Wait for temperatures to stabilize",
            "4. Note the differences from expected temperature",
            "5. Update calibration offsets in the configuration",
            "=======================================",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    )
}

/// Printed when CSV streaming is entered through a bare token.
pub fn csv_banner(temperatures: usize, voltages: usize) -> String {
    lines(vec![
        String::from("CSV streaming mode enabled"),
        format!("Format: {}", csv_header(temperatures, voltages)),
        String::from("Error values represented as -999.00 (temperature) and -999.0000 (voltage)"),
    ])
}

pub const JSON_BANNER: &str = "JSON streaming mode enabled";
pub const HUMAN_BANNER: &str = "Human-readable mode enabled";
pub const INSTRUMENT_BANNER: &str = "Instrument mode enabled";

pub const HELP: &str = "\
Commands:\r
  *IDN?                       Identify instrument\r
  *RST                        Reset to instrument mode\r
  MEAS:TEMP? <ALL|CHn>        Calibrated temperature, degC\r
  MEAS:TEMP:RAW? <ALL|CHn>    Uncalibrated temperature, degC\r
  MEAS:TEMP:FAHR? <ALL|CHn>   Calibrated temperature, degF\r
  MEAS:VOLT? <ALL|CHn>        Calibrated voltage, V\r
  MEAS:VOLT:RAW? <ALL|CHn>    Uncalibrated voltage, V\r
  MEAS:ALL?                   All temperatures then all voltages\r
  RELAY:SET <Rn|ALL>,<ON|OFF> Switch relay(s)\r
  RELAY:GET? <Rn|ALL>         Relay state(s), 1 or 0\r
  SYST:ERR?  SYST:VERS?       System status and version\r
  CONF:TEMP:COUNT?  CONF:VOLT:COUNT?  CONF:RELAY:COUNT?  CONF:RATE?\r
  CONF:TEMP:OFFS? <ALL|CHn>   CONF:VOLT:OFFS? <ALL|CHn>\r
  MODE:INST  MODE:STREAM [CSV|JSON]  MODE:DIAG  MODE:CAL  MODE?\r
  DIAG:TEST?                  Individual sensor test\r
  HELP?  ?                    This text\r
Aliases: CAL CSV LVON LABVIEW JSON HUMAN LVOFF INST EXIT DEBUG TEST";
