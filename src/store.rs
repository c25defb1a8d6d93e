//! ==============================================================================
//! store.rs - ingestion & override store
//! ==============================================================================
//!
//! purpose:
//!     owns the two pieces of shared state:
//!     - the recent sensor readings (RecordStore)
//!     - the operator controls (ControlState)
//!
//!     and implements ingestion: apply overrides, stamp timestamp and flags,
//!     then upsert by device_id (or collapse to a single record when the
//!     reading has no device_id).
//!
//! relationships:
//!     - used by: api.rs (every endpoint), cleanup.rs (periodic prune)
//!     - uses: controls.rs (override application), domain.rs (SensorRecord)
//!
//! concurrency:
//!     one tokio rwlock per aggregate. each mutation takes its write lock
//!     exactly once, so readers never observe a half-applied ingest, reset
//!     or prune.
//!
//!     ┌──────────────┐   read (snapshot)   ┌──────────────┐
//!     │   ingest     │ ──────────────────► │ ControlState │
//!     │              │                     └──────────────┘
//!     │              │   write (upsert)    ┌──────────────┐
//!     │              │ ──────────────────► │ RecordStore  │ ◄── prune (cleanup.rs)
//!     └──────────────┘                     └──────────────┘
//!
//! ==============================================================================

use crate::controls::{ControlSpec, ControlState, ControlTarget};
use crate::domain::{self, ControlValue, SensorRecord, REQUIRED_FIELDS};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tokio::sync::RwLock;

// ==============================================================================
// record store
// ==============================================================================

/// insertion-ordered readings; front is oldest, back is newest
#[derive(Debug, Default)]
pub struct RecordStore {
    records: VecDeque<SensorRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// keyed upsert when the record carries a device_id, otherwise the store
    /// collapses to this single record
    pub fn insert(&mut self, record: SensorRecord) {
        match record.device_id().cloned() {
            Some(id) => self
                .records
                .retain(|existing| !same_device(existing.device_id().unwrap_or(&Value::Null), &id)),
            None => self.records.clear(),
        }
        self.records.push_back(record);
    }

    /// drop oldest records until at most `max_records` remain
    pub fn prune(&mut self, max_records: usize) -> usize {
        let mut removed = 0;
        while self.records.len() > max_records {
            self.records.pop_front();
            removed += 1;
        }
        removed
    }

    /// most recent first
    pub fn list(&self) -> Vec<SensorRecord> {
        self.records.iter().rev().cloned().collect()
    }

    pub fn latest(&self) -> Option<&SensorRecord> {
        self.records.back()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// device ids match when equal as json, with numbers compared by value
/// (`1` and `1.0` are the same device)
fn same_device(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

// ==============================================================================
// telemetry store - the shared aggregate handed to handlers
// ==============================================================================

pub struct TelemetryStore {
    controls: RwLock<ControlState>,
    records: RwLock<RecordStore>,
    max_records: usize,
}

impl TelemetryStore {
    pub fn new(max_records: usize) -> Self {
        Self {
            controls: RwLock::new(ControlState::default()),
            records: RwLock::new(RecordStore::new()),
            max_records,
        }
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// validate, override, enrich and store a raw reading.
    /// the store may exceed max_records until the next prune.
    pub async fn ingest(&self, raw: Map<String, Value>) -> Result<SensorRecord> {
        if let Some(field) = REQUIRED_FIELDS.iter().find(|f| !raw.contains_key(**f)) {
            return Err(Error::MissingField(field.to_string()));
        }

        let controls = self.controls.read().await.clone();

        let mut record = SensorRecord::new(raw);
        controls.apply_overrides(&mut record);
        record.insert("timestamp", Value::String(domain::utc_timestamp()));
        controls.stamp_flags(&mut record);

        self.records.write().await.insert(record.clone());
        Ok(record)
    }

    /// set (value present) or clear (value absent / null) a control slot;
    /// a cleared flag is off. returns the value now in effect.
    pub async fn set_override(
        &self,
        spec: &ControlSpec,
        value: Option<&Value>,
    ) -> Result<Option<ControlValue>> {
        let coerced = match value {
            Some(Value::Null) | None => None,
            Some(v) => Some(spec.coerce(v)?),
        };
        let mut controls = self.controls.write().await;
        controls.set_override(spec.target, coerced)?;
        Ok(controls.get(spec.target))
    }

    pub async fn set_flag(&self, target: ControlTarget, on: bool) {
        self.controls.write().await.set_flag(target, on);
    }

    /// dispatch a control request by its table entry. flags given no value
    /// switch off; overrides given no value clear.
    pub async fn apply_control(
        &self,
        spec: &ControlSpec,
        value: Option<&Value>,
    ) -> Result<Option<ControlValue>> {
        self.set_override(spec, value).await
    }

    pub async fn reset_controls(&self) {
        *self.controls.write().await = ControlState::default();
    }

    pub async fn controls(&self) -> ControlState {
        self.controls.read().await.clone()
    }

    pub async fn active_controls(&self) -> usize {
        self.controls.read().await.active_count()
    }

    pub async fn list_records(&self) -> Vec<SensorRecord> {
        self.records.read().await.list()
    }

    pub async fn latest_record(&self) -> Option<SensorRecord> {
        self.records.read().await.latest().cloned()
    }

    pub async fn reset_records(&self) {
        self.records.write().await.clear();
    }

    pub async fn prune(&self) -> usize {
        self.records.write().await.prune(self.max_records)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// timestamp of the most recent reading
    pub async fn last_update(&self) -> Option<String> {
        self.records
            .read()
            .await
            .latest()
            .and_then(|r| r.timestamp().map(str::to_string))
    }
}
