//! Classification of raw WebProxy responses
//!
//! Read operations surface every failure as an error. Write operations fold
//! failures into a [`WriteResponse`] with `success == false`.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ProxyError, Result};
use crate::message;
use crate::request::ProxyRequest;
use crate::types::WriteResponse;

/// Decide the outcome of a call from its status code and body
///
/// Any 2xx status yields the decoded JSON payload. Other statuses map onto
/// the [`ProxyError`] categories, naming `operation` and `operand` in the
/// message.
pub fn classify(status: StatusCode, body: &str, operation: &str, operand: &str) -> Result<Value> {
    if status.is_success() {
        return serde_json::from_str(body).map_err(ProxyError::invalid_format);
    }

    let error = match status {
        StatusCode::UNAUTHORIZED => {
            ProxyError::Unauthorized(message::unauthorized(operation, operand))
        }
        StatusCode::FORBIDDEN => ProxyError::Forbidden(message::forbidden(operation, operand)),
        StatusCode::UNPROCESSABLE_ENTITY => {
            ProxyError::Unprocessable(message::unprocessable(operation, operand))
        }
        _ => ProxyError::OperationFailed {
            status: status.as_u16(),
            message: message::error_on_operation(
                operation,
                status.as_u16(),
                &reason_with_detail(status, body),
            ),
        },
    };
    Err(error)
}

/// Decode the response of a read operation into `T`
pub fn read_outcome<T: DeserializeOwned>(
    request: &ProxyRequest,
    status: StatusCode,
    body: &str,
) -> Result<T> {
    let value = classify(status, body, &request.operation, &request.operand)?;
    serde_json::from_value(value).map_err(ProxyError::invalid_format)
}

/// Fold the response of a write operation into a [`WriteResponse`]
pub fn write_outcome(request: &ProxyRequest, status: StatusCode, body: &str) -> WriteResponse {
    let decoded = classify(status, body, &request.operation, &request.operand).and_then(|value| {
        serde_json::from_value::<WriteResponse>(value).map_err(ProxyError::invalid_format)
    });

    match decoded {
        Ok(response) => response.normalized(),
        Err(e) => WriteResponse::failure(e.to_string()),
    }
}

/// Reason phrase of `status`, extended with the `detail` field some WebProxy
/// endpoints put in their error bodies.
fn reason_with_detail(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown Status");

    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| payload.get("detail").cloned());

    match detail {
        Some(Value::String(detail)) => format!("{reason} - {detail}"),
        Some(Value::Null) | None => reason.to_string(),
        Some(other) => format!("{reason} - {other}"),
    }
}
