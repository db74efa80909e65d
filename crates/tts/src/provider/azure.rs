use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    error::ProviderError,
    http_client::http_client,
    markup::build_markup,
    types::{Prosody, Voice},
};

use super::{SpeechProvider, error_for_status, read_audio};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// Azure Cognitive Services speech provider
pub(crate) struct AzureSpeechProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl AzureSpeechProvider {
    /// Create a provider for `region`, or for an explicit `base_url`
    /// (which wins when both are set)
    pub fn new(api_key: SecretString, region: Option<&str>, base_url: Option<&str>) -> Self {
        let base_url = base_url.map_or_else(
            || format!("https://{}.tts.speech.microsoft.com", region.unwrap_or_default()),
            |url| url.trim_end_matches('/').to_string(),
        );

        Self {
            client: http_client(),
            base_url,
            api_key,
        }
    }

    async fn post_markup(&self, document: String) -> Result<Bytes, ProviderError> {
        let url = format!("{}/cognitiveservices/v1", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.expose_secret())
            .header(http::header::CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, OUTPUT_FORMAT)
            .body(document)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Azure speech request failed: {e}");
                ProviderError::ConnectionError(format!("Failed to send request to Azure speech: {e}"))
            })?;

        let audio = read_audio("Azure speech", response).await?;

        tracing::debug!("Azure speech synthesis complete, {} bytes", audio.len());

        Ok(audio)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AzureVoice {
    short_name: String,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    local_name: Option<String>,
}

impl From<AzureVoice> for Voice {
    fn from(voice: AzureVoice) -> Self {
        Self {
            name: voice.short_name,
            locale: voice.locale,
            gender: voice.gender,
            display_name: voice.local_name,
        }
    }
}

#[async_trait]
impl SpeechProvider for AzureSpeechProvider {
    async fn synthesize_text(&self, text: &str, voice: &str, prosody: &Prosody) -> Result<Bytes, ProviderError> {
        tracing::debug!("Azure speech text request: voice={voice}, input_len={}", text.len());

        self.post_markup(build_markup(text, voice, prosody, None)).await
    }

    async fn synthesize_markup(&self, document: &str, voice: &str) -> Result<Bytes, ProviderError> {
        tracing::debug!("Azure speech markup request: voice={voice}, document_len={}", document.len());

        self.post_markup(document.to_string()).await
    }

    async fn voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let url = format!("{}/cognitiveservices/voices/list", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Azure voice list request failed: {e}");
                ProviderError::ConnectionError(format!("Failed to send request to Azure speech: {e}"))
            })?;

        let voices: Vec<AzureVoice> = error_for_status("Azure speech", response).await?.json().await.map_err(|e| {
            tracing::error!("Failed to parse Azure voice list: {e}");
            ProviderError::InternalError(Some(format!("Invalid voice list from Azure: {e}")))
        })?;

        Ok(voices.into_iter().map(Voice::from).collect())
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}
