//! Environmental sensor reading.
//!
//! The relay keeps exactly one reading: each ingest replaces the previous
//! one wholesale and no history is retained.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single reading from the environmental sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Light level in lux, non-negative.
    pub light: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity percentage, 0–100.
    pub humidity: f64,
}

impl SensorReading {
    pub fn new(light: f64, temperature: f64, humidity: f64) -> Result<Self> {
        if !light.is_finite() || !temperature.is_finite() || !humidity.is_finite() {
            return Err(Error::Validation("sensor fields must be finite numbers".into()));
        }
        if light < 0.0 {
            return Err(Error::Validation(format!("light must be >= 0 lux, got {light}")));
        }
        if !(0.0..=100.0).contains(&humidity) {
            return Err(Error::Validation(format!(
                "humidity must be within 0-100 percent, got {humidity}"
            )));
        }
        Ok(Self { light, temperature, humidity })
    }

    /// Build a reading from an ingest payload where every field is optional
    /// at the wire level. A missing field is a validation error.
    pub fn try_from_parts(
        light: Option<f64>,
        temperature: Option<f64>,
        humidity: Option<f64>,
    ) -> Result<Self> {
        let light = light.ok_or_else(|| Error::Validation("missing field `light`".into()))?;
        let temperature =
            temperature.ok_or_else(|| Error::Validation("missing field `temperature`".into()))?;
        let humidity =
            humidity.ok_or_else(|| Error::Validation("missing field `humidity`".into()))?;
        Self::new(light, temperature, humidity)
    }
}
