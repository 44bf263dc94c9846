//! Game configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration written by `shadownet init`. Mirrors `GameConfig::default()`.
pub const DEFAULT_CONFIG_YAML: &str = r#"# Shadow Network configuration

data_dir: .shadownet/data
prompts_dir: .shadownet/prompts
voice_cache_dir: .shadownet/voice-cache

world_event_history: 20

rogue:
  loyalty_threshold: 50
  loyalty_chance: 0.30
  tension_threshold: 80
  tension_chance: 0.20
  relationship_chance: 0.40

game_over:
  exposure_limit: 100
  trust_floor: 0
  critical_event_limit: 3

llm:
  model: mistral-large-latest
  api_key_env: MISTRAL_API_KEY

voice:
  api_key_env: ELEVENLABS_API_KEY
  timeout_secs: 60
"#;

/// Main game configuration, loaded from .shadownet/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Config version
    pub version: Option<String>,

    /// Live and initial state snapshots (relative to project root)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Prompt templates directory (relative to project root)
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    /// Cached voice transmissions (relative to project root)
    #[serde(default = "default_voice_cache_dir")]
    pub voice_cache_dir: PathBuf,

    /// Field operatives, in routing-fallback order
    #[serde(default = "default_roster")]
    pub roster: Vec<OperativeConfig>,

    /// Autonomous event thresholds
    #[serde(default)]
    pub rogue: RogueConfig,

    /// Game-over limits
    #[serde(default)]
    pub game_over: GameOverConfig,

    /// Number of world events retained in history
    #[serde(default = "default_world_event_history")]
    pub world_event_history: usize,

    /// Language model settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Voice synthesis settings
    #[serde(default)]
    pub voice: VoiceConfig,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperativeConfig {
    pub codename: String,
    /// Region key in the world state
    pub region: String,
    /// Synthesis voice, if any
    #[serde(default)]
    pub voice_id: Option<String>,
}

impl OperativeConfig {
    fn new(codename: &str, region: &str, voice_id: &str) -> Self {
        Self {
            codename: codename.to_string(),
            region: region.to_string(),
            voice_id: Some(voice_id.to_string()),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".shadownet/data")
}
fn default_prompts_dir() -> PathBuf {
    PathBuf::from(".shadownet/prompts")
}
fn default_voice_cache_dir() -> PathBuf {
    PathBuf::from(".shadownet/voice-cache")
}
fn default_world_event_history() -> usize {
    20
}

fn default_roster() -> Vec<OperativeConfig> {
    vec![
        OperativeConfig::new("NIGHTHAWK", "middle_east", "PleK417YVMP2SUWm8Btb"),
        OperativeConfig::new("CEDAR", "middle_east", "IKne3meq5aSn9XLyUdCD"),
        OperativeConfig::new("GHOST", "south_asia", "TX3LPaxmHKxFdv7VOQHJ"),
        OperativeConfig::new("SABLE", "eastern_europe", "XB0fDUnXU5powFXDhCwa"),
        OperativeConfig::new("LOTUS", "east_asia", "pFZP5JQG7iQjIQuC4Bku"),
    ]
}

/// Rogue engine trigger thresholds and probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RogueConfig {
    /// Loyalty below which an operative may act on its own
    pub loyalty_threshold: i32,
    pub loyalty_chance: f64,
    /// Regional tension above which foreign services make contact
    pub tension_threshold: i32,
    pub tension_chance: f64,
    /// Chance an operative who knows of a compromise speaks up
    pub relationship_chance: f64,
}

impl Default for RogueConfig {
    fn default() -> Self {
        Self {
            loyalty_threshold: 50,
            loyalty_chance: 0.30,
            tension_threshold: 80,
            tension_chance: 0.20,
            relationship_chance: 0.40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOverConfig {
    pub exposure_limit: i32,
    pub trust_floor: i32,
    /// Critical-threat world events tolerated before the world spirals
    pub critical_event_limit: usize,
}

impl Default for GameOverConfig {
    fn default() -> Self {
        Self {
            exposure_limit: 100,
            trust_floor: 0,
            critical_event_limit: 3,
        }
    }
}

/// Chat completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub json_temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mistral.ai/v1/chat/completions".to_string(),
            model: "mistral-large-latest".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            temperature: 0.7,
            json_temperature: 0.5,
            timeout_secs: 60,
        }
    }
}

/// Text-to-speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.elevenlabs.io/v1/text-to-speech".to_string(),
            model: "eleven_multilingual_v2".to_string(),
            api_key_env: "ELEVENLABS_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: None,
            data_dir: default_data_dir(),
            prompts_dir: default_prompts_dir(),
            voice_cache_dir: default_voice_cache_dir(),
            roster: default_roster(),
            rogue: RogueConfig::default(),
            game_over: GameOverConfig::default(),
            world_event_history: default_world_event_history(),
            llm: LlmConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        if config.roster.is_empty() {
            anyhow::bail!("Config {} defines an empty roster", path.display());
        }
        Ok(config)
    }

    /// Load from project root (looks for .shadownet/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".shadownet/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve paths relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.data_dir = project_root.join(&self.data_dir);
        self.prompts_dir = project_root.join(&self.prompts_dir);
        self.voice_cache_dir = project_root.join(&self.voice_cache_dir);
    }

    /// Roster codenames in configured order
    pub fn codenames(&self) -> Vec<String> {
        self.roster.iter().map(|op| op.codename.clone()).collect()
    }

    pub fn operative(&self, codename: &str) -> Option<&OperativeConfig> {
        self.roster.iter().find(|op| op.codename == codename)
    }

    /// First roster entry; routing falls back to it
    pub fn default_operative(&self) -> &str {
        self.roster
            .first()
            .map(|op| op.codename.as_str())
            .unwrap_or("NIGHTHAWK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
rogue:
  loyalty_threshold: 40
world_event_history: 5
"#;
        let config: GameConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.rogue.loyalty_threshold, 40);
        assert_eq!(config.rogue.loyalty_chance, 0.30);
        assert_eq!(config.world_event_history, 5);
        assert_eq!(config.roster.len(), 5);
        assert_eq!(config.default_operative(), "NIGHTHAWK");
        assert_eq!(config.llm.model, "mistral-large-latest");
    }

    #[test]
    fn init_config_matches_defaults() {
        let written: GameConfig = serde_yaml::from_str(DEFAULT_CONFIG_YAML).unwrap();
        let default = GameConfig::default();
        assert_eq!(written.data_dir, default.data_dir);
        assert_eq!(written.prompts_dir, default.prompts_dir);
        assert_eq!(written.voice_cache_dir, default.voice_cache_dir);
        assert_eq!(written.world_event_history, default.world_event_history);
        assert_eq!(written.rogue.relationship_chance, default.rogue.relationship_chance);
        assert_eq!(written.roster, default.roster);
        assert_eq!(written.voice.timeout_secs, default.voice.timeout_secs);
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GameConfig::load_from_project(dir.path()).unwrap();
        config.resolve_paths(dir.path());
        assert!(config.data_dir.starts_with(dir.path()));
        assert_eq!(
            config.operative("SABLE").map(|op| op.region.as_str()),
            Some("eastern_europe")
        );
    }

    #[test]
    fn empty_roster_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "roster: []\n").unwrap();
        assert!(GameConfig::load(&path).is_err());
    }
}
