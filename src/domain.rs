use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// fields every incoming reading must carry, checked in this order
pub const REQUIRED_FIELDS: [&str; 4] = ["temperature", "humidity", "gas_level", "motion_detected"];

/// a stored sensor reading
/// kept as a flexible json payload so extra fields the device sends survive
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct SensorRecord(Map<String, Value>);

impl SensorRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// device identifier, `None` when the reading carries no device_id key
    pub fn device_id(&self) -> Option<&Value> {
        self.0.get("device_id")
    }

    /// the injected ingestion timestamp
    pub fn timestamp(&self) -> Option<&str> {
        self.0.get("timestamp").and_then(Value::as_str)
    }
}

/// a typed control value after coercion
#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum ControlValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Float(v) => write!(f, "{}", v),
            ControlValue::Int(v) => write!(f, "{}", v),
            ControlValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<ControlValue> for Value {
    fn from(value: ControlValue) -> Self {
        match value {
            ControlValue::Float(v) => Value::from(v),
            ControlValue::Int(v) => Value::from(v),
            ControlValue::Bool(v) => Value::from(v),
        }
    }
}

/// current utc time as an rfc 3339 string (microsecond precision, `Z` suffix)
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
