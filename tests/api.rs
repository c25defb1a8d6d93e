//! end-to-end tests: drive the axum router in-process with oneshot requests

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use telemetry_hub::api::{self, AppState};
use telemetry_hub::config::SystemConfig;
use tower::ServiceExt;

fn app() -> (Router, AppState) {
    let state = AppState::new(SystemConfig::default(), false);
    (api::router(state.clone()), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, value) = send_raw(app, method, uri, body.map(|b| b.to_string())).await;
    (status, value)
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "http://wokwi.test");
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty)).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()));
    (status, headers, value)
}

fn reading() -> Value {
    json!({"temperature": 22, "humidity": 40, "gas_level": 10, "motion_detected": false})
}

#[tokio::test]
async fn post_data_echoes_reading() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/data", Some(reading())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["data"]["temperature"], 22);
    assert_eq!(body["data"]["lights"], false);
    assert!(body["data"]["timestamp"].is_string());
    assert_eq!(body["controls"]["temperature_override"], Value::Null);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn post_data_missing_field_is_400() {
    let (app, _) = app();
    let mut payload = reading();
    payload.as_object_mut().unwrap().remove("gas_level");

    let (status, body) = send(&app, Method::POST, "/data", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("gas_level"));
}

#[tokio::test]
async fn post_data_rejects_non_object_body() {
    let (app, _) = app();
    let (status, _, body) = send_raw(&app, Method::POST, "/data", Some("not json".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn temperature_override_applies_to_next_reading() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/control/temperature", Some(json!({"value": 99}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Temperature set to 99");
    assert_eq!(body["current_override"], 99.0);

    let mut payload = reading();
    payload["temperature"] = json!(1);
    send(&app, Method::POST, "/data", Some(payload)).await;

    let (_, latest) = send(&app, Method::GET, "/latest", None).await;
    assert_eq!(latest["data"]["temperature"], 99.0);
    assert_eq!(latest["controls"]["temperature_override"], 99.0);
}

#[tokio::test]
async fn control_without_value_disables_override() {
    let (app, state) = app();
    send(&app, Method::POST, "/control/gas", Some(json!({"value": 400}))).await;
    assert_eq!(state.store.controls().await.gas_override, Some(400));

    let (status, body) = send(&app, Method::POST, "/control/gas", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Gas level override disabled");
    assert_eq!(body["current_override"], Value::Null);

    // an empty body counts as "no value" too
    send(&app, Method::POST, "/control/humidity", Some(json!({"value": 70}))).await;
    let (status, _, body) = send_raw(&app, Method::POST, "/control/humidity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_override"], Value::Null);
}

#[tokio::test]
async fn bad_control_value_is_500() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/control/motion", Some(json!({"value": "sometimes"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("motion"));
}

#[tokio::test]
async fn flags_are_set_and_stamped() {
    let (app, _) = app();
    let (_, body) = send(&app, Method::POST, "/control/lights", Some(json!({"value": true}))).await;
    assert_eq!(body["message"], "Lights set to true");
    assert_eq!(body["current_override"], true);

    let (_, body) = send(&app, Method::POST, "/control/simulation_mode", Some(json!({"value": "on"}))).await;
    assert_eq!(body["message"], "Simulation mode set to on");
    assert_eq!(body["current_override"], true);
    let (_, body) = send(&app, Method::POST, "/data", Some(reading())).await;
    assert_eq!(body["data"]["lights"], true);
    assert_eq!(body["data"]["simulation_mode"], true);
    assert_eq!(body["data"]["alarm"], false);

    let (_, controls) = send(&app, Method::GET, "/controls", None).await;
    assert_eq!(controls["controls"]["lights"], true);
    assert!(controls["timestamp"].is_string());
}

#[tokio::test]
async fn reset_controls_restores_defaults() {
    let (app, _) = app();
    send(&app, Method::POST, "/control/alarm", Some(json!({"value": 1}))).await;
    send(&app, Method::POST, "/control/humidity", Some(json!({"value": 12.5}))).await;

    let (status, body) = send(&app, Method::POST, "/controls/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "message": "All controls have been reset"}));

    let (_, controls) = send(&app, Method::GET, "/controls", None).await;
    assert_eq!(
        controls["controls"],
        json!({
            "temperature_override": null,
            "humidity_override": null,
            "gas_override": null,
            "motion_override": null,
            "lights": false,
            "alarm": false,
            "simulation_mode": false,
        })
    );
}

#[tokio::test]
async fn get_data_lists_most_recent_first() {
    let (app, _) = app();
    for id in ["kitchen", "garage", "kitchen"] {
        let mut payload = reading();
        payload["device_id"] = json!(id);
        send(&app, Method::POST, "/data", Some(payload)).await;
    }

    let (status, body) = send(&app, Method::GET, "/data", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_records"], 2);
    assert_eq!(body["data"][0]["device_id"], "kitchen");
    assert_eq!(body["data"][1]["device_id"], "garage");
}

#[tokio::test]
async fn latest_is_404_when_empty() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "No data available"}));
}

#[tokio::test]
async fn data_reset_empties_store() {
    let (app, _) = app();
    send(&app, Method::POST, "/data", Some(reading())).await;

    let (status, body) = send(&app, Method::POST, "/data/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sensor data cleared");

    let (_, body) = send(&app, Method::GET, "/data", None).await;
    assert_eq!(body["total_records"], 0);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn status_and_health_report_store() {
    let (app, _) = app();
    let (_, status) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status["system"], "OK");
    assert_eq!(status["version"], "2.0");
    assert_eq!(status["records"], 0);
    assert_eq!(status["last_update"], Value::Null);
    assert_eq!(status["config"], json!({"update_interval": 1, "max_records": 100, "auto_cleanup": true}));

    let (_, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["uptime"], "running");
    assert_eq!(health["last_update"], "never");

    send(&app, Method::POST, "/control/motion", Some(json!({"value": false}))).await;
    let (_, posted) = send(&app, Method::POST, "/data", Some(reading())).await;

    let (_, status) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status["records"], 1);
    assert_eq!(status["active_controls"], 1);
    assert_eq!(status["last_update"], posted["data"]["timestamp"]);

    let (_, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(health["data_count"], 1);
    assert_eq!(health["last_update"], posted["data"]["timestamp"]);
}

#[tokio::test]
async fn responses_carry_cors_headers() {
    let (app, _) = app();
    let (_, headers, _) = send_raw(&app, Method::GET, "/health", None).await;
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "Content-Type,Authorization");
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET,PUT,POST,DELETE,OPTIONS");

    let (status, headers, _) = send_raw(&app, Method::POST, "/data", Some("{}".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(headers.get_all(header::ACCESS_CONTROL_ALLOW_METHODS).iter().count(), 1);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/data")
        .header(header::ORIGIN, "http://wokwi.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(preflight).await.unwrap();
    assert!(response.status().is_success());
    let methods = response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap();
    assert!(methods.to_str().unwrap().contains("POST"));
}

#[tokio::test]
async fn root_reports_running() {
    let (app, _) = app();
    let (status, _, body) = send_raw(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(api::ROOT_MESSAGE));
}

#[tokio::test]
async fn unknown_control_is_not_routed() {
    let (app, _) = app();
    let (status, _, _) = send_raw(&app, Method::POST, "/control/fan", Some("{}".into())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn zero_and_false_overrides_count_as_active() {
    let (app, _) = app();
    send(&app, Method::POST, "/control/gas", Some(json!({"value": 0}))).await;
    send(&app, Method::POST, "/control/motion", Some(json!({"value": false}))).await;
    send(&app, Method::POST, "/control/lights", Some(json!({"value": "on"}))).await;

    let (_, status) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status["active_controls"], 3);
}

#[tokio::test]
async fn numeric_device_ids_are_one_device() {
    let (app, _) = app();
    for id in [json!(7), json!(7.0)] {
        let mut payload = reading();
        payload["device_id"] = id;
        send(&app, Method::POST, "/data", Some(payload)).await;
    }

    let (_, body) = send(&app, Method::GET, "/data", None).await;
    assert_eq!(body["total_records"], 1);
}
