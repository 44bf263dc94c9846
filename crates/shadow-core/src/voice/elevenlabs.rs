//! ElevenLabs text-to-speech client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{Synthesizer, VoiceError};
use crate::config::VoiceConfig;

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct ElevenLabsClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl ElevenLabsClient {
    pub fn from_config(config: &VoiceConfig) -> Result<Self, VoiceError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(VoiceError::Unconfigured)?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout,
        })
    }

    /// Per-request limit applied to every synthesis call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsClient {
    async fn synthesize(&self, voice_id: &str, text: &str) -> Result<Vec<u8>, VoiceError> {
        let response = self
            .http
            .post(format!("{}/{voice_id}", self.endpoint))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
