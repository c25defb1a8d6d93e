//! ==============================================================================
//! telemetry-hub - ESP32 sensor telemetry & remote control api
//! ==============================================================================
//!
//! modules:
//!     - domain:   SensorRecord, ControlValue, timestamps
//!     - controls: override/flag state, the control table, value coercion
//!     - store:    ingestion & override store (the shared aggregate)
//!     - cleanup:  periodic prune task
//!     - api:      axum router and handlers
//!     - config:   telemetry.toml loader
//!     - error:    request error taxonomy
//!
//! ==============================================================================

pub mod api;
pub mod cleanup;
pub mod config;
pub mod controls;
pub mod domain;
pub mod error;
pub mod store;

pub use error::{Error, Result};
