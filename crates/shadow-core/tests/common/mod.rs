#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shadow_core::adapters::InlineTemplates;
use shadow_core::rng::ScriptedRandom;
use shadow_core::state::{scenario, MemoryStore};
use shadow_core::{GameConfig, GenerationError, Generator, TurnManager};

pub const QUIET_EVENT: &str = r#"{
    "event_title": "Quiet Night",
    "event_description": "Nothing moves on the wires.",
    "affected_region": null,
    "tension_impact": 0,
    "suggested_actions": ["Stand by"]
}"#;

pub const COMPLY_REPLY: &str = "Understood, Director. Moving now.\n\
[HIDDEN_META]\n\
decision: comply\n\
loyalty_shift: 0\n\
reason: Routine tasking.\n\
tension_impact: 0\n\
exposure_impact: 0\n\
[/HIDDEN_META]";

pub const BRIEFING: &str = "SITUATION: Stable across all theatres.";
pub const INTEL: &str = "ASSESSMENT: Report received and consistent.";
pub const NARRATION: &str = "FIELD ALERT: Something has changed.";

/// Generator that answers each request kind with canned text and records
/// every user message it saw.
#[derive(Default)]
pub struct ScriptedGenerator {
    fail: bool,
    event: Mutex<Option<String>>,
    routing: Mutex<Option<String>>,
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails, as if the service were down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn set_event(&self, json: &str) {
        *self.event.lock().unwrap() = Some(json.to_string());
    }

    pub fn set_routing(&self, json: &str) {
        *self.routing.lock().unwrap() = Some(json.to_string());
    }

    pub fn route_to(&self, codename: &str, brief: &str) {
        self.set_routing(
            &serde_json::json!({
                "target_operative": codename,
                "mission_brief": brief,
                "mission_type": "reconnaissance",
                "risk_level": "medium",
            })
            .to_string(),
        );
    }

    /// Queue an operative reply; replies are used in order.
    pub fn push_reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(text.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn answer(&self, user: &str) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(user.to_string());
        if self.fail {
            return Err(GenerationError::Unavailable("scripted outage".into()));
        }
        let text = if user.starts_with("MODE: GENERATE_EVENT") {
            self.event.lock().unwrap().clone().unwrap_or_else(|| QUIET_EVENT.to_string())
        } else if user.starts_with("MODE: ROUTE_ORDER") {
            self.routing
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "not json".to_string())
        } else if user.starts_with("MODE: SYNTHESIZE_INTEL") {
            INTEL.to_string()
        } else if user.starts_with("MODE: TURN_BRIEFING") {
            BRIEFING.to_string()
        } else if user.starts_with("ORDER RECEIVED:") {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| COMPLY_REPLY.to_string())
        } else {
            NARRATION.to_string()
        };
        Ok(text)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn complete(
        &self,
        _system: &str,
        user: &str,
        _temperature: f32,
    ) -> Result<String, GenerationError> {
        self.answer(user)
    }

    async fn complete_json(
        &self,
        _system: &str,
        user: &str,
        _temperature: f32,
    ) -> Result<String, GenerationError> {
        self.answer(user)
    }
}

pub fn seeded_store() -> MemoryStore {
    MemoryStore::seeded(&scenario::default_world(), &scenario::default_agents())
}

/// Session over the default scenario whose autonomous rolls never fire.
pub fn session(generator: Arc<ScriptedGenerator>) -> TurnManager {
    session_with(generator, ScriptedRandom::constant(0.99))
}

pub fn session_with(generator: Arc<ScriptedGenerator>, rng: ScriptedRandom) -> TurnManager {
    TurnManager::new(
        GameConfig::default(),
        Box::new(seeded_store()),
        generator,
        Box::new(InlineTemplates::builtin()),
    )
    .with_rng(Box::new(rng))
}
