use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Failure reported by a synthesis provider
///
/// Cloneable because one provider call may be awaited by several coalesced
/// requests.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider rejected the input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The configured API key was refused
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider returned a non-success status
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The provider answered successfully but sent no audio
    #[error("Provider returned no audio")]
    EmptyAudio,

    /// Internal failure; details are only exposed when they came from the provider
    #[error("Internal provider error")]
    InternalError(Option<String>),
}

/// Speech service errors with appropriate HTTP status codes
#[derive(Debug, Error)]
pub enum TtsError {
    /// Audio could not be produced
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(#[from] ProviderError),

    /// The caller stopped waiting; synthesis may still complete in the background
    #[error("Request cancelled before synthesis completed")]
    Cancelled,

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TtsError {
    /// Get the appropriate HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::SynthesisFailed(ProviderError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::SynthesisFailed(ProviderError::ProviderApiError { status: 429, .. }) => StatusCode::TOO_MANY_REQUESTS,
            Self::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string for the response
    pub const fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) | Self::SynthesisFailed(ProviderError::InvalidRequest(_)) => "invalid_request_error",
            Self::SynthesisFailed(_) => "api_error",
            Self::Cancelled => "timeout_error",
            Self::ConfigError(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers
    pub fn client_message(&self) -> String {
        match self {
            Self::SynthesisFailed(ProviderError::InternalError(Some(provider_msg))) => provider_msg.clone(),
            Self::SynthesisFailed(ProviderError::InternalError(None)) => "Synthesis failed".to_string(),
            Self::ConfigError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error response format compatible with the `OpenAI` API
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = ErrorResponse {
            error: ErrorDetails {
                message: self.client_message(),
                r#type: self.error_type().to_string(),
                code: status.as_u16(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}
