//! Calibration arithmetic.
//!
//! Offsets are additive and a failed reading stays failed: nothing in here
//! turns "no reading" into a number.

/// Applies an additive calibration offset to a raw reading.
pub fn calibrate(raw: Option<f64>, offset: f64) -> Option<f64> {
    raw.map(|value| value + offset)
}

/// Converts a (calibrated) Celsius value to Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: Option<f64>) -> Option<f64> {
    celsius.map(|c| c * 9.0 / 5.0 + 32.0)
}

/// Summary of a raw reading set, used by the calibration report.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Mean over the channels that produced a reading, `None` if none did.
    pub mean: Option<f64>,
    /// `(channel number, reading - mean)` for every channel that produced a reading.
    pub deviations: Vec<(usize, f64)>,
}

impl Statistics {
    /// Computes the mean and per-channel deviation of `readings`.
    ///
    /// `readings[i]` belongs to channel `i + 1`. Failed channels are left
    /// out of the sum, the denominator and the deviation list.
    pub fn from_readings(readings: &[Option<f64>]) -> Self {
        let valid: Vec<(usize, f64)> = readings
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.filter(|v| v.is_finite()).map(|v| (i + 1, v)))
            .collect();

        if valid.is_empty() {
            return Self {
                mean: None,
                deviations: Vec::new(),
            };
        }

        let mean = valid.iter().map(|(_, v)| v).sum::<f64>() / valid.len() as f64;
        Self {
            mean: Some(mean),
            deviations: valid.into_iter().map(|(n, v)| (n, v - mean)).collect(),
        }
    }
}
