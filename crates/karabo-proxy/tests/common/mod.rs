//! Mock WebProxy routers shared by the client integration tests
//!
//! The valid mock answers like a healthy WebProxy and keeps injected
//! properties in memory. The invalid mock answers every endpoint with a
//! malformed payload or an error status.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const TOPOLOGY_VALID: &str = r#"{
    "device": {"A_SIMPLE_DEVICE": {"__deviceId__": "A_SIMPLE_DEVICE", "visibility": 4}},
    "server": {"A_SIMPLE_SERVER": {"__serverId__": "A_SIMPLE_SERVER"}},
    "client": {},
    "macro": {}
}"#;

/// Plural section names and no "macro" section
pub const TOPOLOGY_INVALID: &str = r#"{
    "devices": {"A_SIMPLE_DEVICE": {"__deviceId__": "A_SIMPLE_DEVICE"}},
    "servers": {"A_SIMPLE_SERVER": {"__serverId__": "A_SIMPLE_SERVER"}},
    "client": {}
}"#;

pub const DEVICE_TIMESTAMP: f64 = 1720510279.5;

fn json_text(text: &'static str) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], text).into_response()
}

fn detail(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": detail.into() }))).into_response()
}

fn ok() -> Json<Value> {
    Json(json!({"success": true, "reason": ""}))
}

// =============================================================================
// Valid Mock
// =============================================================================

#[derive(Clone, Default)]
struct MockState {
    injected: Arc<Mutex<HashMap<String, Value>>>,
}

pub fn valid_web_proxy() -> Router {
    Router::new()
        .route("/topology.json", get(|| async { json_text(TOPOLOGY_VALID) }))
        .route("/devices.json", get(valid_devices))
        .route(
            "/devices/{id}/config.json",
            get(valid_get_config).put(valid_put_config),
        )
        .route("/devices/{id}/schema.json", get(valid_schema))
        .route("/devices/{id}/slot/{slot}", put(valid_slot))
        .route(
            "/property/{name}/config.json",
            get(valid_get_injected)
                .post(valid_add_injected)
                .put(valid_set_injected)
                .delete(valid_delete_injected),
        )
        .with_state(MockState::default())
}

async fn valid_devices() -> Json<Value> {
    Json(json!({
        "device": {
            "A_SIMPLE_DEVICE": {"__deviceId__": "A_SIMPLE_DEVICE", "classId": "SimpleDevice"}
        }
    }))
}

/// `{id}` is either a device id or `<device id>.<property>`
async fn valid_get_config(Path(target): Path<String>) -> Json<Value> {
    match target.split_once('.') {
        Some(_) => Json(json!({"value": 42, "timestamp": DEVICE_TIMESTAMP, "tid": 7})),
        None => Json(json!({
            "_deviceId_": {"value": target, "timestamp": DEVICE_TIMESTAMP, "tid": 0},
            "state": {"value": "ON", "timestamp": DEVICE_TIMESTAMP, "tid": 0},
            "speeds": {"value": [1.5, 2.5], "timestamp": DEVICE_TIMESTAMP, "tid": 0}
        })),
    }
}

async fn valid_put_config(Path(_target): Path<String>, Json(_body): Json<Value>) -> Json<Value> {
    ok()
}

async fn valid_schema(Path(_device_id): Path<String>) -> Json<Value> {
    Json(json!({
        "state": {
            "displayedName": "State",
            "accessMode": 4,
            "options": ["ON", "OFF"],
            "daqPolicy": null
        },
        "node": {"description": "A node", "leaves": {"unit": "m"}}
    }))
}

async fn valid_slot(
    Path((device_id, slot)): Path<(String, String)>,
    Json(params): Json<Value>,
) -> Response {
    let slot = slot.trim_end_matches(".json");
    if slot != "divide" {
        return ok().into_response();
    }
    let (Some(dividend), Some(divisor)) = (params["dividend"].as_i64(), params["divisor"].as_i64())
    else {
        return detail(
            StatusCode::BAD_REQUEST,
            format!("{device_id}.{slot} needs dividend and divisor"),
        );
    };
    Json(json!({
        "success": true,
        "reason": "",
        "reply": {"quotient": dividend / divisor, "remainder": dividend % divisor}
    }))
    .into_response()
}

async fn valid_add_injected(
    State(state): State<MockState>,
    Path(name): Path<String>,
    Json(_body): Json<Value>,
) -> Response {
    let mut injected = state.injected.lock();
    if injected.contains_key(&name) {
        return detail(StatusCode::CONFLICT, "property already existing");
    }
    injected.insert(name, json!({"value": null, "timestamp": 0.0, "tid": 0}));
    ok().into_response()
}

async fn valid_get_injected(State(state): State<MockState>, Path(name): Path<String>) -> Response {
    match state.injected.lock().get(&name) {
        Some(value) => Json(value.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "property not among the injected set"),
    }
}

async fn valid_set_injected(
    State(state): State<MockState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    match state.injected.lock().get_mut(&name) {
        Some(value) => {
            *value = body;
            ok().into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "property not among the injected set"),
    }
}

async fn valid_delete_injected(State(state): State<MockState>, Path(name): Path<String>) -> Response {
    match state.injected.lock().remove(&name) {
        Some(_) => ok().into_response(),
        None => detail(StatusCode::NOT_FOUND, "property not among the injected set"),
    }
}

// =============================================================================
// Invalid Mock
// =============================================================================

pub fn invalid_web_proxy() -> Router {
    Router::new()
        .route("/topology.json", get(|| async { json_text(TOPOLOGY_INVALID) }))
        .route("/devices.json", get(|| async { json_text("not json at all") }))
        .route(
            "/devices/{id}/config.json",
            get(invalid_get_config).put(invalid_put_config),
        )
        .route(
            "/devices/{id}/schema.json",
            get(|| async { detail(StatusCode::INTERNAL_SERVER_ERROR, "Device not online") }),
        )
        .route("/devices/{id}/slot/{slot}", put(invalid_slot))
        .route(
            "/property/{name}/config.json",
            get(|| async { json_text("{}") })
                .post(|| async { detail(StatusCode::CONFLICT, "property already existing") })
                .put(|| async {
                    detail(StatusCode::NOT_FOUND, "property not among the injected set")
                })
                .delete(|| async {
                    detail(StatusCode::NOT_FOUND, "property not among the injected set")
                }),
        )
}

async fn invalid_get_config(Path(target): Path<String>) -> Response {
    match target.split_once('.') {
        // Sample without timestamp and train id
        Some(_) => json_text(r#"{"value": 1}"#),
        None => detail(StatusCode::NOT_FOUND, "Device not online"),
    }
}

async fn invalid_put_config(Path(target): Path<String>) -> StatusCode {
    match target.split_once('.') {
        Some(_) => StatusCode::FORBIDDEN,
        None => StatusCode::UNAUTHORIZED,
    }
}

async fn invalid_slot(Path((device_id, slot)): Path<(String, String)>) -> Response {
    let slot = slot.trim_end_matches(".json");
    if slot == "locked" {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    Json(json!({
        "success": false,
        "reason": format!("{device_id} has no slot {slot}"),
        "reply": {"stale": true}
    }))
    .into_response()
}
