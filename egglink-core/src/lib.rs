pub mod error;
pub mod normalize;
pub mod status;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::ValidationError;
pub use normalize::{CoercionPolicy, normalize, normalize_bytes};
pub use status::{DeviceSummary, Status, StatusPolicy, listing_order, short_id};

/// Identifier reported by a device in the `e` field.
///
/// Treated as an opaque, case-sensitive token. In practice this is the
/// device's IPv6 address as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Box<str>);

impl DeviceId {
    /// Shared identifier for payloads that carry no usable `e` field.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(id: impl Into<Box<str>>) -> Self {
        Self(id.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Numeric metrics understood by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Temperature in °C (`t`).
    Temperature,
    /// Air humidity in % (`uA`).
    AirHumidity,
    /// Soil humidity in % (`uS`).
    SoilHumidity,
    /// Particulate level (`p`). Drives the fire alarm.
    Particulate,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::AirHumidity,
        Metric::SoilHumidity,
        Metric::Particulate,
    ];

    /// Key used for this metric in device payloads.
    pub const fn key(self) -> &'static str {
        match self {
            Metric::Temperature => "t",
            Metric::AirHumidity => "uA",
            Metric::SoilHumidity => "uS",
            Metric::Particulate => "p",
        }
    }
}

/// Key/value fields of a reading.
///
/// Metric keys hold numbers once normalized; every other key a device sends
/// (`d`, `e`, ...) is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Numeric value of a metric, if present and numeric.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.0.get(metric.key()).and_then(Value::as_f64)
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A normalized payload that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub device_id: DeviceId,
    pub fields: Fields,
}

/// A sample as kept in a device history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Device the reading belongs to.
    pub device_id: DeviceId,
    /// Server clock at the moment the reading was stored.
    pub received_at: jiff::Timestamp,
    /// Normalized fields, including pass-through keys.
    pub fields: Fields,
}

impl Reading {
    /// Ingestion time as whole seconds since the epoch.
    pub fn ts(&self) -> i64 {
        self.received_at.as_second()
    }
}
