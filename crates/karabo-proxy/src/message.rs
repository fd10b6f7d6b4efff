//! Human-readable messages for every failure class
//!
//! Shared by the async and blocking clients so both report identical text.

use std::fmt::Display;

/// The response did not parse, or did not have the expected shape.
pub fn invalid_response_format(reason: impl Display) -> String {
    format!("Invalid response format: {reason}")
}

/// Generic failure of `operation` with the given status and reason phrase.
pub fn error_on_operation(operation: &str, status: u16, reason: &str) -> String {
    format!("Error {operation}: {reason} ({status})")
}

/// HTTP 401
pub fn unauthorized(operation: &str, operand: &str) -> String {
    format!(
        "Lacking valid access_token with permissions to {operation} of '{operand}': \
         please obtain a token and pass it to set_access_token."
    )
}

/// HTTP 403
pub fn forbidden(operation: &str, operand: &str) -> String {
    format!(
        "Cannot {operation} ('{operand}'): check if the device is reconfigurable and \
         the access_token has the required permissions."
    )
}

/// HTTP 422
pub fn unprocessable(operation: &str, operand: &str) -> String {
    format!("Cannot {operation} ({operand}): device is not reconfigurable.")
}
