//! Voice transmissions - text-to-speech per operative, with a file cache.

mod cache;
mod elevenlabs;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

pub use cache::VoiceCache;
pub use elevenlabs::ElevenLabsClient;

use crate::config::GameConfig;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Voice synthesis is not configured")]
    Unconfigured,

    #[error("No voice configured for {0}")]
    NoVoice(String),

    #[error("Synthesis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Synthesis API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Voice cache failure at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Text-to-speech backend.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// MP3 bytes for `text` spoken in `voice_id`.
    async fn synthesize(&self, voice_id: &str, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// Voices, cache and backend for one session.
pub struct VoiceService {
    synthesizer: Option<Box<dyn Synthesizer>>,
    cache: VoiceCache,
    voices: HashMap<String, String>,
}

impl VoiceService {
    pub fn new(
        synthesizer: Option<Box<dyn Synthesizer>>,
        cache: VoiceCache,
        config: &GameConfig,
    ) -> Self {
        let voices = config
            .roster
            .iter()
            .filter_map(|op| op.voice_id.clone().map(|id| (op.codename.clone(), id)))
            .collect();
        Self {
            synthesizer,
            cache,
            voices,
        }
    }

    /// Service backed by ElevenLabs when its API key is set, otherwise
    /// unconfigured.
    pub fn from_config(config: &GameConfig) -> Self {
        let synthesizer = match ElevenLabsClient::from_config(&config.voice) {
            Ok(client) => Some(Box::new(client) as Box<dyn Synthesizer>),
            Err(e) => {
                tracing::warn!(error = %e, "Voice synthesis disabled");
                None
            }
        };
        Self::new(synthesizer, VoiceCache::new(&config.voice_cache_dir), config)
    }

    pub fn is_configured(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn cache(&self) -> &VoiceCache {
        &self.cache
    }

    /// Spoken version of an operative's transmission, from cache when
    /// possible.
    pub async fn transmission(&self, codename: &str, text: &str) -> Result<Vec<u8>, VoiceError> {
        let synthesizer = self.synthesizer.as_deref().ok_or(VoiceError::Unconfigured)?;
        let voice_id = self
            .voices
            .get(codename)
            .ok_or_else(|| VoiceError::NoVoice(codename.to_string()))?;

        if let Some(audio) = self.cache.get(codename, text)? {
            tracing::info!(codename = %codename, "Voice cache hit");
            return Ok(audio);
        }

        let audio = synthesizer
            .synthesize(voice_id, text)
            .await
            .inspect_err(|e| {
                tracing::error!(codename = %codename, error = %e, "Synthesis failed")
            })?;
        self.cache.put(codename, text, &audio)?;
        tracing::info!(codename = %codename, bytes = audio.len(), "Generated and cached audio");
        Ok(audio)
    }

    /// Short check phrase for an operative's voice.
    pub async fn test_transmission(&self, codename: &str) -> Result<Vec<u8>, VoiceError> {
        let text = format!("This is {codename}, secure channel confirmed. Standing by for orders.");
        self.transmission(codename, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSynth {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Synthesizer for CountingSynth {
        async fn synthesize(&self, voice_id: &str, text: &str) -> Result<Vec<u8>, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{voice_id}:{text}").into_bytes())
        }
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let service = VoiceService::new(
            Some(Box::new(CountingSynth { calls: calls.clone() })),
            VoiceCache::new(dir.path()),
            &GameConfig::default(),
        );

        let first = service.transmission("GHOST", "Copy that.").await.unwrap();
        let second = service.transmission("GHOST", "Copy that.").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        service.test_transmission("GHOST").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unconfigured_and_unknown_voices_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = GameConfig::default();
        let service = VoiceService::new(None, VoiceCache::new(dir.path()), &config);
        assert!(!service.is_configured());
        assert!(matches!(
            service.transmission("GHOST", "x").await,
            Err(VoiceError::Unconfigured)
        ));

        let calls = Arc::new(AtomicUsize::new(0));
        let service = VoiceService::new(
            Some(Box::new(CountingSynth { calls })),
            VoiceCache::new(dir.path()),
            &config,
        );
        assert!(matches!(
            service.transmission("ZEPHYR", "x").await,
            Err(VoiceError::NoVoice(name)) if name == "ZEPHYR"
        ));
    }
}
