//! Typed views over domain event payloads.
//!
//! Payloads travel as JSON objects so the store never needs to know their
//! shape. Consumers parse them into the reading structs below. Numbers may
//! arrive either as JSON numbers or as numeric strings; anything else, or
//! a missing required field, is a [`PayloadError`] that callers treat as a
//! skip for the affected zone.

use serde_json::{Map, Value, json};

/// Payload field written for traffic volume.
pub const FIELD_VOLUME: &str = "volume";
/// Payload field written for average traffic speed (km/h).
pub const FIELD_AVG_SPEED: &str = "avg_speed";
/// Payload field written for temperature (Celsius).
pub const FIELD_TEMP_C: &str = "temp_c";
/// Payload field written for relative humidity (percent).
pub const FIELD_HUMIDITY: &str = "humidity";
/// Payload field written for rainfall (mm).
pub const FIELD_RAIN_MM: &str = "rain_mm";
/// Alternate rainfall field accepted from older producers.
pub const FIELD_RAINFALL_MM: &str = "rainfall_mm";
/// Payload field written for population vulnerability.
pub const FIELD_VULNERABILITY: &str = "baseline_vulnerability";
/// Optional payload field carrying reported disease cases.
pub const FIELD_DISEASE_CASES: &str = "disease_cases";
/// Payload field written for food supply units.
pub const FIELD_SUPPLY_UNITS: &str = "supply_units";
/// Payload field written for the food price index.
pub const FIELD_PRICE_INDEX: &str = "price_index";

/// A payload could not be read as the expected reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field {field}")]
    MissingField {
        /// The missing field name.
        field: &'static str,
    },

    /// A field is present but is not a finite number.
    #[error("field {field} is not numeric: {raw}")]
    NotNumeric {
        /// The offending field name.
        field: &'static str,
        /// The raw JSON text of the value.
        raw: String,
    },
}

/// Coerce a JSON value to a finite `f64`.
///
/// Accepts numbers and strings that parse as numbers. Returns `None` for
/// anything else, including `NaN` and infinities.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, PayloadError> {
    payload.as_object().ok_or(PayloadError::NotAnObject)
}

/// Read a required numeric field.
///
/// # Errors
///
/// Returns [`PayloadError`] when the payload is not an object, the field
/// is missing, or the field does not coerce to a finite number.
pub fn required_f64(payload: &Value, field: &'static str) -> Result<f64, PayloadError> {
    let raw = as_object(payload)?
        .get(field)
        .ok_or(PayloadError::MissingField { field })?;
    coerce_f64(raw).ok_or_else(|| PayloadError::NotNumeric {
        field,
        raw: raw.to_string(),
    })
}

/// Read an optional numeric field, treating unusable values as absent.
pub fn optional_f64(payload: &Value, field: &str) -> Option<f64> {
    payload.get(field).and_then(coerce_f64)
}

/// A traffic sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficReading {
    /// Vehicles observed in the sampling interval.
    pub volume: f64,
    /// Average speed in km/h.
    pub avg_speed: f64,
}

impl TrafficReading {
    /// Parse a traffic payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if a required field is missing or malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            volume: required_f64(payload, FIELD_VOLUME)?,
            avg_speed: required_f64(payload, FIELD_AVG_SPEED)?,
        })
    }

    /// Encode as an event payload.
    pub fn to_payload(&self) -> Value {
        json!({ FIELD_VOLUME: self.volume, FIELD_AVG_SPEED: self.avg_speed })
    }
}

/// A weather station reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    /// Air temperature in Celsius.
    pub temp_c: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Rainfall in mm since the previous reading.
    pub rain_mm: f64,
}

impl WeatherReading {
    /// Parse a weather payload. Rainfall is optional and defaults to zero.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if temperature or humidity is missing or
    /// malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            temp_c: required_f64(payload, FIELD_TEMP_C)?,
            humidity: required_f64(payload, FIELD_HUMIDITY)?,
            rain_mm: rainfall(payload).unwrap_or(0.0),
        })
    }

    /// Encode as an event payload.
    pub fn to_payload(&self) -> Value {
        json!({
            FIELD_TEMP_C: self.temp_c,
            FIELD_HUMIDITY: self.humidity,
            FIELD_RAIN_MM: self.rain_mm,
        })
    }
}

/// Read rainfall from `rain_mm`, falling back to `rainfall_mm`.
pub fn rainfall(payload: &Value) -> Option<f64> {
    optional_f64(payload, FIELD_RAIN_MM).or_else(|| optional_f64(payload, FIELD_RAINFALL_MM))
}

/// A public-health reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthReading {
    /// Share of the population considered vulnerable, in `[0, 1]`.
    pub baseline_vulnerability: f64,
}

impl HealthReading {
    /// Parse a health payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the vulnerability field is missing or
    /// malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            baseline_vulnerability: required_f64(payload, FIELD_VULNERABILITY)?,
        })
    }

    /// Encode as an event payload.
    pub fn to_payload(&self) -> Value {
        json!({ FIELD_VULNERABILITY: self.baseline_vulnerability })
    }
}

/// An agricultural market reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgriReading {
    /// Food supply units arriving in the zone.
    pub supply_units: f64,
    /// Food price index (100 = reference price).
    pub price_index: f64,
}

impl AgriReading {
    /// Parse an agriculture payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if a required field is missing or malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            supply_units: required_f64(payload, FIELD_SUPPLY_UNITS)?,
            price_index: required_f64(payload, FIELD_PRICE_INDEX)?,
        })
    }

    /// Encode as an event payload.
    pub fn to_payload(&self) -> Value {
        json!({ FIELD_SUPPLY_UNITS: self.supply_units, FIELD_PRICE_INDEX: self.price_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_are_coerced() {
        let payload = json!({ "volume": "812.5", "avg_speed": 31 });
        let reading = TrafficReading::from_payload(&payload);
        assert_eq!(
            reading,
            Ok(TrafficReading {
                volume: 812.5,
                avg_speed: 31.0
            })
        );
    }

    #[test]
    fn missing_field_is_reported() {
        let payload = json!({ "volume": 800.0 });
        assert_eq!(
            TrafficReading::from_payload(&payload),
            Err(PayloadError::MissingField {
                field: FIELD_AVG_SPEED
            })
        );
    }

    #[test]
    fn non_numeric_field_is_reported() {
        let payload = json!({ "supply_units": "lots", "price_index": 101.0 });
        assert!(matches!(
            AgriReading::from_payload(&payload),
            Err(PayloadError::NotNumeric {
                field: FIELD_SUPPLY_UNITS,
                ..
            })
        ));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert_eq!(
            HealthReading::from_payload(&json!([0.5])),
            Err(PayloadError::NotAnObject)
        );
    }

    #[test]
    fn rainfall_falls_back_to_legacy_field() {
        assert_eq!(rainfall(&json!({ "rainfall_mm": 4.0 })), Some(4.0));
        assert_eq!(rainfall(&json!({ "rain_mm": 2.0, "rainfall_mm": 4.0 })), Some(2.0));
        assert_eq!(rainfall(&json!({})), None);
    }

    #[test]
    fn weather_rain_defaults_to_zero() {
        let reading = WeatherReading::from_payload(&json!({ "temp_c": 30.0, "humidity": 55.0 }));
        assert_eq!(reading.map(|r| r.rain_mm), Ok(0.0));
    }

    #[test]
    fn payload_encoding_reads_back() {
        let original = AgriReading {
            supply_units: 1700.0,
            price_index: 109.0,
        };
        assert_eq!(AgriReading::from_payload(&original.to_payload()), Ok(original));
    }
}
