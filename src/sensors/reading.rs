// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Readings and batches

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::SensorKind;

/// Sensor-specific metadata attached to a reading
pub type Metadata = Map<String, Value>;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Sampled value, numeric or boolean depending on the sensor type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Flag(bool),
    Number(f64),
}

impl ReadingValue {
    /// The value a failed read carries
    pub fn zero(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Motion => Self::Flag(false),
            _ => Self::Number(0.0),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Number(v) => v,
            Self::Flag(true) => 1.0,
            Self::Flag(false) => 0.0,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Flag(b) => Some(b),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for ReadingValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<ReadingValue> for Value {
    fn from(v: ReadingValue) -> Self {
        match v {
            ReadingValue::Number(n) => Value::from(n),
            ReadingValue::Flag(b) => Value::Bool(b),
        }
    }
}

/// Who produced a reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorIdentity {
    pub id: String,
    pub kind: SensorKind,
    pub unit: String,
}

impl SensorIdentity {
    pub fn new(id: impl Into<String>, kind: SensorKind, unit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            unit: unit.into(),
        }
    }
}

/// One immutable, timestamped sample from one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    sensor_id: String,
    sensor_type: SensorKind,
    value: ReadingValue,
    unit: String,
    timestamp: DateTime<Utc>,
    quality: f64,
    metadata: Metadata,
}

impl Reading {
    /// Quality is clamped into [0, 1]; a non-finite quality becomes 0.
    pub fn new(
        identity: &SensorIdentity,
        value: ReadingValue,
        quality: f64,
        metadata: Metadata,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let quality = if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            sensor_id: identity.id.clone(),
            sensor_type: identity.kind,
            value,
            unit: identity.unit.clone(),
            timestamp,
            quality,
            metadata,
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn sensor_type(&self) -> SensorKind {
        self.sensor_type
    }

    pub fn value(&self) -> ReadingValue {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Boolean metadata flag, false when absent
    pub fn flag(&self, key: &str) -> bool {
        self.metadata.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Error message of a failed read
    pub fn error(&self) -> Option<&str> {
        self.metadata.get("error").and_then(Value::as_str)
    }

    pub fn is_failed(&self) -> bool {
        self.quality == 0.0 && self.error().is_some()
    }

    /// Plain key/value form for logging, export and the web API
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("sensor_id".into(), Value::from(self.sensor_id.as_str()));
        record.insert("sensor_type".into(), Value::from(self.sensor_type.name()));
        record.insert("value".into(), self.value.into());
        record.insert("unit".into(), Value::from(self.unit.as_str()));
        record.insert(
            "timestamp".into(),
            Value::from(self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        record.insert("quality".into(), Value::from(self.quality));
        record.insert("metadata".into(), Value::Object(self.metadata.clone()));
        Value::Object(record)
    }
}

/// Readings produced by one sampling tick, keyed by sensor id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    timestamp: DateTime<Utc>,
    readings: BTreeMap<String, Reading>,
}

impl Batch {
    pub fn new(timestamp: DateTime<Utc>, readings: BTreeMap<String, Reading>) -> Self {
        Self { timestamp, readings }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn get(&self, sensor_id: &str) -> Option<&Reading> {
        self.readings.get(sensor_id)
    }

    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.readings.values()
    }

    pub fn sensor_ids(&self) -> impl Iterator<Item = &str> {
        self.readings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// `{ timestamp, sensors: { id: { value, unit } } }`
    pub fn summary(&self) -> Value {
        let sensors: Map<String, Value> = self
            .readings
            .iter()
            .map(|(id, reading)| {
                (
                    id.clone(),
                    json!({ "value": Value::from(reading.value()), "unit": reading.unit() }),
                )
            })
            .collect();
        json!({
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            "sensors": sensors,
        })
    }

    /// Full record of every reading, ordered by sensor id
    pub fn records(&self) -> Vec<Value> {
        self.readings.values().map(Reading::to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn emf() -> SensorIdentity {
        SensorIdentity::new("emf", SensorKind::Emf, "mG")
    }

    #[test]
    fn test_quality_is_clamped() {
        let now = Utc::now();
        let high = Reading::new(&emf(), 1.0.into(), 1.7, Metadata::new(), now);
        let low = Reading::new(&emf(), 1.0.into(), -0.2, Metadata::new(), now);
        let nan = Reading::new(&emf(), 1.0.into(), f64::NAN, Metadata::new(), now);
        assert_eq!(high.quality(), 1.0);
        assert_eq!(low.quality(), 0.0);
        assert_eq!(nan.quality(), 0.0);
    }

    #[test]
    fn test_record_field_set() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 31, 23, 59, 0).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("alert".into(), Value::Bool(true));
        let reading = Reading::new(&emf(), 2.5.into(), 1.0, metadata, ts);

        let record = reading.to_record();
        let object = record.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["metadata", "quality", "sensor_id", "sensor_type", "timestamp", "unit", "value"]
        );
        assert_eq!(record["sensor_type"], "emf");
        assert_eq!(record["value"], 2.5);
        assert_eq!(record["timestamp"], "2026-10-31T23:59:00Z");
        assert_eq!(record["metadata"]["alert"], true);
    }

    #[test]
    fn test_empty_metadata_is_an_object() {
        let motion = SensorIdentity::new("motion", SensorKind::Motion, "bool");
        let reading = Reading::new(&motion, false.into(), 1.0, Metadata::new(), Utc::now());
        let record = reading.to_record();
        assert_eq!(record["metadata"], json!({}));
        assert_eq!(record["value"], false);
    }

    #[test]
    fn test_batch_summary_shape() {
        let now = Utc::now();
        let pressure = SensorIdentity::new("pressure", SensorKind::Pressure, "hPa");
        let mut readings = BTreeMap::new();
        readings.insert("emf".to_string(), Reading::new(&emf(), 0.31.into(), 1.0, Metadata::new(), now));
        readings.insert(
            "pressure".to_string(),
            Reading::new(&pressure, 1013.2.into(), 1.0, Metadata::new(), now),
        );
        let batch = Batch::new(now, readings);

        let summary = batch.summary();
        assert_eq!(summary["sensors"]["emf"], json!({ "value": 0.31, "unit": "mG" }));
        assert_eq!(summary["sensors"]["pressure"]["unit"], "hPa");
        assert!(summary["timestamp"].is_string());
        assert_eq!(batch.records().len(), 2);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234_56, 2), 1.23);
        assert_eq!(round_to(-3.25, 1), -3.3);
        assert_eq!(round_to(0.012_36, 4), 0.0124);
    }
}
