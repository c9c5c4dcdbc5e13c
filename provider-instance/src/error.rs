//! Error types for the instance provider

use thiserror::Error;

/// Instance table API errors
#[derive(Error, Debug)]
pub enum InstanceApiError {
    /// API request returned an error status
    #[error("Instance API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse an API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Update-set export payload could not be parsed
    #[error("Malformed update-set export: {0}")]
    MalformedExport(#[from] core_payload::PayloadError),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for instance API operations
pub type Result<T> = std::result::Result<T, InstanceApiError>;

impl From<InstanceApiError> for bridge_traits::error::BridgeError {
    fn from(error: InstanceApiError) -> Self {
        match error {
            InstanceApiError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::ApiError {
                status_code,
                message,
            },
            InstanceApiError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            InstanceApiError::MalformedExport(err) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Malformed update-set export: {}",
                    err
                ))
            }
            InstanceApiError::BridgeError(e) => e,
        }
    }
}
