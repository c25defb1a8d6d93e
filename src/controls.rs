//! ==============================================================================
//! controls.rs - remote control state and the control table
//! ==============================================================================
//!
//! purpose:
//!     holds the operator-set overrides and flags, and the static table that
//!     describes each control endpoint (name, target field, value type).
//!
//!     overrides (temperature, humidity, gas, motion) replace the matching
//!     field on every ingested reading while set. flags (lights, alarm,
//!     simulation_mode) are plain booleans stamped onto each reading.
//!
//! relationships:
//!     - used by: store.rs (owns a ControlState behind its own lock)
//!     - used by: api.rs (iterates CONTROLS once to register /control/{name})
//!
//! coercion:
//!     json values are parsed explicitly per type. nothing is cast silently:
//!     a value either parses into the declared type or yields an error that
//!     names the control.
//!
//! ==============================================================================

use crate::domain::{ControlValue, SensorRecord};
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;

// ==============================================================================
// control state
// ==============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ControlState {
    pub temperature_override: Option<f64>,
    pub humidity_override: Option<f64>,
    pub gas_override: Option<i64>,
    pub motion_override: Option<bool>,
    pub lights: bool,
    pub alarm: bool,
    pub simulation_mode: bool,
}

/// a single slot in ControlState
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlTarget {
    TemperatureOverride,
    HumidityOverride,
    GasOverride,
    MotionOverride,
    Lights,
    Alarm,
    SimulationMode,
}

impl ControlTarget {
    /// flags are direct booleans; everything else is a clearable override
    pub fn is_flag(self) -> bool {
        matches!(self, ControlTarget::Lights | ControlTarget::Alarm | ControlTarget::SimulationMode)
    }

    pub fn key(self) -> &'static str {
        match self {
            ControlTarget::TemperatureOverride => "temperature_override",
            ControlTarget::HumidityOverride => "humidity_override",
            ControlTarget::GasOverride => "gas_override",
            ControlTarget::MotionOverride => "motion_override",
            ControlTarget::Lights => "lights",
            ControlTarget::Alarm => "alarm",
            ControlTarget::SimulationMode => "simulation_mode",
        }
    }
}

/// reading field -> override slot applied on ingest
pub const OVERRIDDEN_FIELDS: [(&str, ControlTarget); 4] = [
    ("temperature", ControlTarget::TemperatureOverride),
    ("humidity", ControlTarget::HumidityOverride),
    ("gas_level", ControlTarget::GasOverride),
    ("motion_detected", ControlTarget::MotionOverride),
];

impl ControlState {
    /// current value of a slot; `None` means the override is cleared
    pub fn get(&self, target: ControlTarget) -> Option<ControlValue> {
        match target {
            ControlTarget::TemperatureOverride => self.temperature_override.map(ControlValue::Float),
            ControlTarget::HumidityOverride => self.humidity_override.map(ControlValue::Float),
            ControlTarget::GasOverride => self.gas_override.map(ControlValue::Int),
            ControlTarget::MotionOverride => self.motion_override.map(ControlValue::Bool),
            ControlTarget::Lights => Some(ControlValue::Bool(self.lights)),
            ControlTarget::Alarm => Some(ControlValue::Bool(self.alarm)),
            ControlTarget::SimulationMode => Some(ControlValue::Bool(self.simulation_mode)),
        }
    }

    /// set or clear a slot. `None` clears an override and switches a flag
    /// off. a value whose kind does not match the slot is rejected and the
    /// slot keeps its previous value.
    pub fn set_override(&mut self, target: ControlTarget, value: Option<ControlValue>) -> Result<()> {
        match (target, value) {
            (ControlTarget::TemperatureOverride, None) => self.temperature_override = None,
            (ControlTarget::TemperatureOverride, Some(ControlValue::Float(v))) => {
                self.temperature_override = Some(v)
            }
            (ControlTarget::HumidityOverride, None) => self.humidity_override = None,
            (ControlTarget::HumidityOverride, Some(ControlValue::Float(v))) => self.humidity_override = Some(v),
            (ControlTarget::GasOverride, None) => self.gas_override = None,
            (ControlTarget::GasOverride, Some(ControlValue::Int(v))) => self.gas_override = Some(v),
            (ControlTarget::MotionOverride, None) => self.motion_override = None,
            (ControlTarget::MotionOverride, Some(ControlValue::Bool(v))) => self.motion_override = Some(v),
            (flag, None) if flag.is_flag() => self.set_flag(flag, false),
            (flag, Some(ControlValue::Bool(on))) if flag.is_flag() => self.set_flag(flag, on),
            (target, Some(other)) => {
                return Err(Error::Coercion {
                    field: target.key().to_string(),
                    message: format!("value {:?} does not match the slot type", other),
                })
            }
            (target, None) => {
                return Err(Error::Internal(format!("unhandled control slot {}", target.key())))
            }
        }
        Ok(())
    }

    /// unconditional set of lights / alarm / simulation_mode. override
    /// targets are ignored here.
    pub fn set_flag(&mut self, target: ControlTarget, on: bool) {
        match target {
            ControlTarget::Lights => self.lights = on,
            ControlTarget::Alarm => self.alarm = on,
            ControlTarget::SimulationMode => self.simulation_mode = on,
            _ => {}
        }
    }

    /// replace reading fields with every active override
    pub fn apply_overrides(&self, record: &mut SensorRecord) {
        for (field, target) in OVERRIDDEN_FIELDS {
            if let Some(value) = self.get(target) {
                record.insert(field, value.into());
            }
        }
    }

    /// stamp the current flags onto a reading
    pub fn stamp_flags(&self, record: &mut SensorRecord) {
        record.insert("lights", Value::Bool(self.lights));
        record.insert("alarm", Value::Bool(self.alarm));
        record.insert("simulation_mode", Value::Bool(self.simulation_mode));
    }

    /// number of overrides set plus flags switched on
    pub fn active_count(&self) -> usize {
        let overrides = [
            self.temperature_override.is_some(),
            self.humidity_override.is_some(),
            self.gas_override.is_some(),
            self.motion_override.is_some(),
        ];
        let flags = [self.lights, self.alarm, self.simulation_mode];
        overrides.iter().chain(flags.iter()).filter(|on| **on).count()
    }
}

// ==============================================================================
// control table
// ==============================================================================
// one entry per POST /control/{name} route. api.rs walks this table once
// when building the router.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Int,
    Bool,
}

#[derive(Debug)]
pub struct ControlSpec {
    /// route segment, e.g. "temperature" -> /control/temperature
    pub name: &'static str,
    /// human readable label used in response messages
    pub description: &'static str,
    pub target: ControlTarget,
    pub kind: ValueKind,
}

pub static CONTROLS: [ControlSpec; 7] = [
    ControlSpec {
        name: "temperature",
        description: "Temperature",
        target: ControlTarget::TemperatureOverride,
        kind: ValueKind::Float,
    },
    ControlSpec {
        name: "humidity",
        description: "Humidity",
        target: ControlTarget::HumidityOverride,
        kind: ValueKind::Float,
    },
    ControlSpec {
        name: "gas",
        description: "Gas level",
        target: ControlTarget::GasOverride,
        kind: ValueKind::Int,
    },
    ControlSpec {
        name: "motion",
        description: "Motion detection",
        target: ControlTarget::MotionOverride,
        kind: ValueKind::Bool,
    },
    ControlSpec {
        name: "lights",
        description: "Lights",
        target: ControlTarget::Lights,
        kind: ValueKind::Bool,
    },
    ControlSpec {
        name: "alarm",
        description: "Alarm",
        target: ControlTarget::Alarm,
        kind: ValueKind::Bool,
    },
    ControlSpec {
        name: "simulation_mode",
        description: "Simulation mode",
        target: ControlTarget::SimulationMode,
        kind: ValueKind::Bool,
    },
];

pub fn find_control(name: &str) -> Option<&'static ControlSpec> {
    CONTROLS.iter().find(|spec| spec.name == name)
}

impl ControlSpec {
    /// parse a json value into this control's declared type
    pub fn coerce(&self, value: &Value) -> Result<ControlValue> {
        let parsed = match self.kind {
            ValueKind::Float => parse_float(value).map(ControlValue::Float),
            ValueKind::Int => parse_int(value).map(ControlValue::Int),
            ValueKind::Bool => parse_bool(value).map(ControlValue::Bool),
        };
        parsed.map_err(|message| Error::Coercion {
            field: self.name.to_string(),
            message,
        })
    }
}

// ==============================================================================
// coercion
// ==============================================================================

/// numbers, or strings holding a finite decimal number
pub fn parse_float(value: &Value) -> std::result::Result<f64, String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(format!("expected a number, got {}", value)),
    }
}

/// integers, whole-valued floats, or strings holding an integer.
/// fractional values are rejected rather than truncated.
pub fn parse_int(value: &Value) -> std::result::Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            if n.is_u64() {
                return Err(format!("integer out of range: {}", n));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(format!("expected an integer, got {}", n)),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("expected an integer, got {}", value)),
        _ => Err(format!("expected an integer, got {}", value)),
    }
}

/// true/false, 0/1, or one of the strings true/false, 1/0, on/off, yes/no
pub fn parse_bool(value: &Value) -> std::result::Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("expected 0 or 1, got {}", n)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(true),
            "false" | "0" | "off" | "no" => Ok(false),
            _ => Err(format!("expected a boolean, got {}", value)),
        },
        _ => Err(format!("expected a boolean, got {}", value)),
    }
}
