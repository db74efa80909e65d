use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    error::ProviderError,
    http_client::http_client,
    types::{Prosody, Voice},
};

use super::{SpeechProvider, read_audio};

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "tts-1";

const VOICES: [&str; 10] = [
    "alloy", "ash", "ballad", "coral", "echo", "fable", "nova", "onyx", "sage", "shimmer",
];

/// `OpenAI` TTS provider
pub(crate) struct OpenAiTtsProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiTtsProvider {
    pub fn new(api_key: SecretString, base_url: Option<&str>, model: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(DEFAULT_OPENAI_API_URL).trim_end_matches('/').to_string();

        Self {
            client: http_client(),
            base_url,
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct OpenAiTtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
}

/// Map a relative rate such as "+25%" or "-10%" onto the `speed` multiplier
///
/// Returns `None` for anything that is not a signed or unsigned percentage.
fn speed_from_rate(rate: &str) -> Option<f64> {
    let percent: f64 = rate.trim().strip_suffix('%')?.trim_start_matches('+').parse().ok()?;

    percent.is_finite().then(|| (1.0 + percent / 100.0).clamp(0.25, 4.0))
}

#[async_trait]
impl SpeechProvider for OpenAiTtsProvider {
    async fn synthesize_text(&self, text: &str, voice: &str, prosody: &Prosody) -> Result<Bytes, ProviderError> {
        let url = format!("{}/audio/speech", self.base_url);

        tracing::debug!(
            "OpenAI TTS request: model={}, voice={voice}, input_len={}",
            self.model,
            text.len(),
        );

        if prosody.volume != "+0%" || !prosody.pitch.starts_with("+0") {
            tracing::debug!(
                volume = %prosody.volume,
                pitch = %prosody.pitch,
                "OpenAI TTS ignores volume and pitch"
            );
        }

        let body = OpenAiTtsRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: "mp3",
            speed: speed_from_rate(&prosody.rate),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI TTS request failed: {e}");
                ProviderError::ConnectionError(format!("Failed to send request to OpenAI TTS: {e}"))
            })?;

        let audio = read_audio("OpenAI TTS", response).await?;

        tracing::debug!("OpenAI TTS synthesis complete, {} bytes", audio.len());

        Ok(audio)
    }

    async fn synthesize_markup(&self, _document: &str, _voice: &str) -> Result<Bytes, ProviderError> {
        Err(ProviderError::InvalidRequest(
            "OpenAI TTS does not accept SSML input; set use_markup to false".to_string(),
        ))
    }

    async fn voices(&self) -> Result<Vec<Voice>, ProviderError> {
        Ok(VOICES
            .iter()
            .map(|name| Voice {
                name: (*name).to_string(),
                locale: None,
                gender: None,
                display_name: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
