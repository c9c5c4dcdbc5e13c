//! Instance table API response types
//!
//! Data structures for deserializing REST table API responses. Record
//! payloads stay as raw JSON values; the pipeline interprets fields itself.

use serde::Deserialize;
use serde_json::Value;

/// Table API page response: `{"result": [...]}`
#[derive(Debug, Deserialize)]
pub struct TableResponse {
    /// Records of this page, in server order
    #[serde(default)]
    pub result: Vec<Value>,
}

/// Table API error envelope: `{"error": {...}, "status": "failure"}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: ErrorDetail,
}

/// Error body inside the envelope
#[derive(Debug, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Human-readable message for an error body, if one can be extracted.
    pub fn extract_message(body: &[u8]) -> Option<String> {
        let parsed: ErrorResponse = serde_json::from_slice(body).ok()?;
        if parsed.error.message.is_empty() {
            return None;
        }
        match parsed.error.detail {
            Some(detail) if !detail.is_empty() => {
                Some(format!("{}: {}", parsed.error.message, detail))
            }
            _ => Some(parsed.error.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_response_parses_result_array() {
        let body = r#"{"result": [{"sys_id": "a"}, {"sys_id": "b"}]}"#;
        let response: TableResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.result.len(), 2);
        assert_eq!(response.result[0]["sys_id"], "a");
    }

    #[test]
    fn test_missing_result_defaults_to_empty() {
        let response: TableResponse = serde_json::from_str("{}").unwrap();
        assert!(response.result.is_empty());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = br#"{"error": {"message": "User Not Authenticated", "detail": "Required to provide Auth information"}}"#;
        assert_eq!(
            ErrorResponse::extract_message(body).as_deref(),
            Some("User Not Authenticated: Required to provide Auth information")
        );
    }

    #[test]
    fn test_error_message_extraction_non_json() {
        assert_eq!(ErrorResponse::extract_message(b"<html>nope</html>"), None);
    }
}
