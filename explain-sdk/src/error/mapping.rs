//! Error mapping for the Gemini API
//!
//! This module converts Gemini error responses to our normalized
//! ServiceError type.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map a Gemini API error envelope to a ServiceError
///
/// Google APIs wrap failures as `{"error": {"code", "message", "status"}}`.
/// The `status` string (e.g. `RESOURCE_EXHAUSTED`) is kept as the error code
/// so the failure classifier can see it.
pub fn map_gemini_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "gemini".to_string();

    let error = json.get("error").unwrap_or(json);

    if let Some(google_status) = error.get("status").and_then(|s| s.as_str()) {
        context.error_code = Some(google_status.to_string());
    }

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown Gemini error");

    map_status(status, message)
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(
    status: StatusCode,
    body: &str,
    context: &mut ErrorContext,
) -> ServiceError {
    // Try to parse as JSON first
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if context.service == "gemini" || json.get("error").map_or(false, Value::is_object) {
            return map_gemini_error(status, &json, context);
        }

        let message = json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(|m| m.as_str())
            .unwrap_or(body);

        return map_status(status, message);
    }

    // Fallback to status-based mapping
    let message = if body.is_empty() {
        status.to_string()
    } else if body.len() > 100 {
        format!("{}: {}...", status, crate::util::truncate_string(body, 100))
    } else {
        format!("{}: {}", status, body)
    };

    map_status(status, message)
}

fn map_status(status: StatusCode, message: impl Into<String>) -> ServiceError {
    let message = message.into();
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE => ServiceError::validation(message),
        StatusCode::NOT_FOUND => ServiceError::service(format!("Resource not found: {}", message)),
        _ => ServiceError::service(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gemini_quota_envelope() {
        let body = json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota",
                "status": "RESOURCE_EXHAUSTED"
            }
        });
        let mut context = ErrorContext::for_service("gemini");

        let error = map_gemini_error(StatusCode::TOO_MANY_REQUESTS, &body, &mut context);

        assert!(matches!(error, ServiceError::RateLimit(_)));
        assert_eq!(context.error_code.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_plain_text_body() {
        let mut context = ErrorContext::for_service("gemini");
        let error = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "upstream down", &mut context);

        assert!(matches!(error, ServiceError::Service(_)));
        assert!(error.to_string().contains("upstream down"));
    }
}
