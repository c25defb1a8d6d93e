//! ==============================================================================
//! api.rs - http api
//! ==============================================================================
//!
//! purpose:
//!     json-over-http surface for the esp32 simulator and operators:
//!     - POST /data receives readings, GET /data and /latest read them back
//!     - POST /control/{name} sets or clears overrides and flags
//!     - /controls, /status, /health report state
//!
//! relationships:
//!     - uses: store.rs (all state), controls.rs (route table), error.rs
//!     - used by: main.rs (serves the router), tests/api.rs
//!
//! middleware (outermost first):
//!     cors -> allow-methods/allow-headers -> trace -> catch panic -> handlers
//!
//!     every response, including 4xx/5xx and panics, carries the permissive
//!     cors headers.
//!
//! ==============================================================================

use crate::config::SystemConfig;
use crate::controls::{ControlSpec, CONTROLS};
use crate::domain::utc_timestamp;
use crate::error::{Error, Result};
use crate::store::TelemetryStore;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// version reported by GET /status
pub const API_VERSION: &str = "2.0";

/// advertised on every response, not only on preflight
const ALLOW_HEADERS: &str = "Content-Type,Authorization";
const ALLOW_METHODS: &str = "GET,PUT,POST,DELETE,OPTIONS";

pub const ROOT_MESSAGE: &str = "API IoT Smart Home - running successfully";

// ==============================================================================
// shared state
// ==============================================================================
// cheap to clone: the store sits behind an arc, the rest is plain data.

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    pub system: SystemConfig,
    /// log every ingested reading at info
    pub show_sensor_data: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(system: SystemConfig, show_sensor_data: bool) -> Self {
        Self {
            store: Arc::new(TelemetryStore::new(system.max_records)),
            system,
            show_sensor_data,
            started_at: Instant::now(),
        }
    }
}

// ==============================================================================
// router
// ==============================================================================

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/data", post(receive_data).get(all_data))
        .route("/latest", get(latest_data))
        .route("/controls", get(all_controls))
        .route("/controls/reset", post(reset_controls))
        .route("/status", get(system_status))
        .route("/data/reset", post(reset_data))
        .route("/health", get(health_check));

    // one route per control table entry
    for spec in CONTROLS.iter() {
        router = router.route(
            &format!("/control/{}", spec.name),
            post(move |State(state): State<AppState>, body: Bytes| set_control(state, spec, body)),
        );
    }

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE, Method::OPTIONS])
}

/// a panicking handler still answers with a json 500
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(detail = %detail, "Handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": detail }))).into_response()
}

/// parse a request body as a json object. an empty body is an empty object.
fn parse_object(body: &Bytes) -> Result<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::Malformed(format!("Expected a JSON object, got {}", other))),
        Err(e) => Err(Error::Malformed(format!("Invalid JSON body: {}", e))),
    }
}

// ==============================================================================
// core endpoints
// ==============================================================================

async fn index() -> &'static str {
    ROOT_MESSAGE
}

/// POST /data - receive a reading from the device
async fn receive_data(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let raw = parse_object(&body)?;
    let record = state.store.ingest(raw).await?;

    if state.show_sensor_data {
        let field = |key: &str| record.get(key).map(ToString::to_string).unwrap_or_else(|| "-".into());
        let device_id = record.device_id().map(ToString::to_string).unwrap_or_else(|| "-".into());
        let (temperature, humidity) = (field("temperature"), field("humidity"));
        let (gas_level, motion) = (field("gas_level"), field("motion_detected"));
        tracing::info!(
            device_id = %device_id,
            temperature = %temperature,
            humidity = %humidity,
            gas_level = %gas_level,
            motion = %motion,
            "Reading received"
        );
    }

    Ok(Json(json!({
        "status": "ok",
        "data": record,
        "controls": state.store.controls().await,
        "timestamp": utc_timestamp(),
    })))
}

/// GET /data - every stored reading, most recent first
async fn all_data(State(state): State<AppState>) -> Json<Value> {
    let records = state.store.list_records().await;
    Json(json!({
        "total_records": records.len(),
        "data": records,
        "controls": state.store.controls().await,
        "timestamp": utc_timestamp(),
    }))
}

/// GET /latest
async fn latest_data(State(state): State<AppState>) -> Result<Json<Value>> {
    let record = state
        .store
        .latest_record()
        .await
        .ok_or_else(|| Error::NotFound("No data available".into()))?;

    Ok(Json(json!({
        "data": record,
        "controls": state.store.controls().await,
        "timestamp": utc_timestamp(),
    })))
}

// ==============================================================================
// remote control endpoints
// ==============================================================================

/// POST /control/{name} - `{"value": x}` sets, no value clears
async fn set_control(state: AppState, spec: &'static ControlSpec, body: Bytes) -> Result<Json<Value>> {
    let payload = parse_object(&body).map_err(|e| Error::Internal(e.to_string()))?;
    let value = payload.get("value");

    let current = state.store.apply_control(spec, value).await?;

    let message = match value {
        Some(v) if !v.is_null() => format!("{} set to {}", spec.description, echo(v)),
        _ => format!("{} override disabled", spec.description),
    };
    tracing::info!(control = spec.name, current = ?current, "{}", message);

    Ok(Json(json!({
        "status": "ok",
        "message": message,
        "current_override": current,
    })))
}

/// the value as the caller sent it; strings without their quotes
fn echo(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// GET /controls
async fn all_controls(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "controls": state.store.controls().await,
        "timestamp": utc_timestamp(),
    }))
}

/// POST /controls/reset
async fn reset_controls(State(state): State<AppState>) -> Json<Value> {
    state.store.reset_controls().await;
    tracing::info!("All controls reset");
    Json(json!({
        "status": "ok",
        "message": "All controls have been reset",
    }))
}

// ==============================================================================
// system management endpoints
// ==============================================================================

/// GET /status
///
/// `active_controls` counts every override that is set, whatever its value
/// (an override of `0` or `false` is still an active override), plus every
/// flag that is on.
async fn system_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "system": "OK",
        "version": API_VERSION,
        "records": state.store.len().await,
        "active_controls": state.store.active_controls().await,
        "last_update": state.store.last_update().await,
        "config": &state.system,
        "timestamp": utc_timestamp(),
    }))
}

/// POST /data/reset
async fn reset_data(State(state): State<AppState>) -> Json<Value> {
    state.store.reset_records().await;
    tracing::info!("Sensor data cleared");
    Json(json!({
        "status": "sensor data cleared",
        "timestamp": utc_timestamp(),
    }))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime": "running",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "data_count": state.store.len().await,
        "last_update": state.store.last_update().await.unwrap_or_else(|| "never".into()),
        "timestamp": utc_timestamp(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_empty_object() {
        assert!(parse_object(&Bytes::from_static(b"")).unwrap().is_empty());
        assert!(parse_object(&Bytes::from_static(b" \n")).unwrap().is_empty());
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(matches!(parse_object(&Bytes::from_static(b"[1,2]")), Err(Error::Malformed(_))));
        assert!(matches!(parse_object(&Bytes::from_static(b"{oops")), Err(Error::Malformed(_))));
    }

    #[test]
    fn echo_keeps_raw_value() {
        assert_eq!(echo(&json!("on")), "on");
        assert_eq!(echo(&json!(99)), "99");
        assert_eq!(echo(&json!(12.5)), "12.5");
        assert_eq!(echo(&json!(true)), "true");
    }

    #[test]
    fn panic_payload_becomes_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
