use anyhow::{Context, Result};
use multitherm_lib::{
    engine::Settings,
    mode::{Cadence, Mode, StreamFormat},
    protocol::Identity,
};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "thermd.yml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_streaming", with = "humantime_serde")]
    pub streaming: Duration,
    #[serde(default = "default_diagnostic", with = "humantime_serde")]
    pub diagnostic: Duration,
    #[serde(default = "default_calibration", with = "humantime_serde")]
    pub calibration: Duration,
}

fn default_streaming() -> Duration {
    Cadence::default().streaming
}

fn default_diagnostic() -> Duration {
    Cadence::default().diagnostic
}

fn default_calibration() -> Duration {
    Cadence::default().calibration
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            streaming: default_streaming(),
            diagnostic: default_diagnostic(),
            calibration: default_calibration(),
        }
    }
}

impl CadenceConfig {
    /// A zero period would make a periodic mode report without pause.
    fn validate(&self) -> Result<()> {
        for (name, period) in [
            ("streaming", self.streaming),
            ("diagnostic", self.diagnostic),
            ("calibration", self.calibration),
        ] {
            anyhow::ensure!(
                !period.is_zero(),
                "cadence.{name} must be greater than zero"
            );
        }
        Ok(())
    }
}

impl From<&CadenceConfig> for Cadence {
    fn from(config: &CadenceConfig) -> Self {
        Cadence {
            streaming: config.streaming,
            diagnostic: config.diagnostic,
            calibration: config.calibration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemperatureConfig {
    /// Offset in °C per thermocouple, one entry per channel.
    #[serde(default = "default_temperature_offsets")]
    pub offsets: Vec<f64>,
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,
}

fn default_temperature_offsets() -> Vec<f64> {
    vec![0.0, -0.25, -0.06, -0.69, -0.69, -0.06, -0.31, -0.19]
}

fn default_settle_delay() -> Duration {
    Duration::from_millis(100)
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            offsets: default_temperature_offsets(),
            settle_delay: default_settle_delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoltageConfig {
    /// Offset in V per ADC input, one entry per channel.
    #[serde(default = "default_voltage_offsets")]
    pub offsets: Vec<f64>,
    /// `false` when the ADC is not fitted; every voltage reads as the sentinel.
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default, with = "humantime_serde")]
    pub settle_delay: Duration,
}

fn default_voltage_offsets() -> Vec<f64> {
    vec![0.0, 0.0]
}

fn default_available() -> bool {
    true
}

impl Default for VoltageConfig {
    fn default() -> Self {
        Self {
            offsets: default_voltage_offsets(),
            available: default_available(),
            settle_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_count")]
    pub count: usize,
}

fn default_relay_count() -> usize {
    8
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            count: default_relay_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Ambient temperature in °C the thermocouples settle around.
    #[serde(default = "default_ambient")]
    pub ambient: f64,
    #[serde(default = "default_noise")]
    pub noise: f64,
    /// Probability of a single read failing.
    #[serde(default)]
    pub dropout: f64,
    /// Level in V every ADC input sits at.
    #[serde(default = "default_voltage")]
    pub voltage: f64,
}

fn default_ambient() -> f64 {
    22.0
}

fn default_noise() -> f64 {
    0.25
}

fn default_voltage() -> f64 {
    1.65
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ambient: default_ambient(),
            noise: default_noise(),
            dropout: 0.0,
            voltage: default_voltage(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: Identity,
    #[serde(default)]
    pub startup_mode: Mode,
    #[serde(default)]
    pub stream_format: StreamFormat,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub temperature: TemperatureConfig,
    #[serde(default)]
    pub voltage: VoltageConfig,
    #[serde(default)]
    pub relays: RelayConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.cadence.validate()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            identity: self.identity.clone(),
            startup_mode: self.startup_mode,
            stream_format: self.stream_format,
            cadence: Cadence::from(&self.cadence),
        }
    }
}

/// Loads the configuration.
///
/// An explicit `path` must exist. Without one, `thermd.yml` in the working
/// directory is used if present, otherwise the built-in defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default_file = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default_file.exists() {
                log::debug!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                return Ok(Config::default());
            }
            default_file
        }
    };
    log::debug!("Loading config file from {path:?}");
    let config_file =
        File::open(&path).with_context(|| format!("Cannot open config file {path:?}"))?;
    let config: Config = serde_yaml::from_reader(&config_file)
        .with_context(|| format!("Cannot parse config file {path:?}"))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {path:?}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.temperature.offsets.len(), 8);
        assert_eq!(config.relays.count, 8);
        assert_eq!(config.settings().startup_mode, Mode::Instrument);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
startup_mode: diagnostic
stream_format: json
identity:
  serial: SN424242
cadence:
  streaming: 500ms
temperature:
  offsets: [0.5, -0.5]
voltage:
  available: false
"#,
        )
        .unwrap();

        assert_eq!(config.startup_mode, Mode::Diagnostic);
        assert_eq!(config.stream_format, StreamFormat::Json);
        assert_eq!(config.identity.serial, "SN424242");
        assert_eq!(config.identity.model, Identity::default().model);
        assert_eq!(config.cadence.streaming, Duration::from_millis(500));
        assert_eq!(config.cadence.calibration, Duration::from_secs(3));
        assert_eq!(config.temperature.offsets, vec![0.5, -0.5]);
        assert_eq!(config.temperature.settle_delay, Duration::from_millis(100));
        assert!(!config.voltage.available);
        assert_eq!(config.voltage.offsets.len(), 2);
    }

    #[test]
    fn settings_carry_cadence() {
        let config: Config = serde_yaml::from_str("cadence: { diagnostic: 5s }").unwrap();
        let settings = config.settings();
        assert_eq!(settings.cadence.diagnostic, Duration::from_secs(5));
        assert_eq!(settings.cadence.streaming, Duration::from_secs(1));
    }

    #[test]
    fn zero_cadence_is_rejected() {
        assert!(Config::default().validate().is_ok());
        for section in [
            "cadence: { streaming: 0s }",
            "cadence: { diagnostic: 0ms }",
            "cadence: { calibration: 0s }",
        ] {
            let config: Config = serde_yaml::from_str(section).unwrap();
            assert!(config.validate().is_err(), "accepted {section}");
        }
    }

    #[test]
    fn load_rejects_zero_cadence_file() {
        let file_name = format!("thermd-zero-{}.yml", std::process::id());
        let path = std::env::temp_dir().join(file_name);
        std::fs::write(&path, "cadence:\n  streaming: 0s\n").unwrap();
        let result = load(Some(&path));
        std::fs::remove_file(&path).unwrap();
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("cadence.streaming"), "{message}");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(serde_yaml::from_str::<Config>("startup_mode: labview").is_err());
    }
}
