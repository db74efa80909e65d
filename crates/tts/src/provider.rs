pub mod azure;
pub mod openai_tts;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::ProviderError,
    types::{Prosody, Voice},
};

/// An external speech synthesis capability
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize plain text with the given voice and prosody
    async fn synthesize_text(&self, text: &str, voice: &str, prosody: &Prosody) -> Result<Bytes, ProviderError>;

    /// Synthesize a complete SSML document
    async fn synthesize_markup(&self, document: &str, voice: &str) -> Result<Bytes, ProviderError>;

    /// Voices the provider offers
    async fn voices(&self) -> Result<Vec<Voice>, ProviderError>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Turn a non-success provider response into a [`ProviderError`]
pub(crate) async fn error_for_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    tracing::error!("{provider} API error ({status}): {error_text}");

    Err(match status.as_u16() {
        400 => ProviderError::InvalidRequest(error_text),
        401 | 403 => ProviderError::AuthenticationFailed(error_text),
        code => ProviderError::ProviderApiError {
            status: code,
            message: error_text,
        },
    })
}

/// Read the audio body of a successful provider response
pub(crate) async fn read_audio(provider: &str, response: reqwest::Response) -> Result<Bytes, ProviderError> {
    let response = error_for_status(provider, response).await?;

    response.bytes().await.map_err(|e| {
        tracing::error!("Failed to read {provider} response body: {e}");
        ProviderError::ConnectionError(format!("Failed to read {provider} audio: {e}"))
    })
}
