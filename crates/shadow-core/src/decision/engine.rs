//! Applies operative decisions and director actions to the world.

use serde::Serialize;

use super::parser::DecisionKind;
use crate::adapters::OperativeResponse;
use crate::error::GameResult;
use crate::state::{AgentRegistry, AgentStatus, MissionLogEntry, MissionRecord, Storage, WorldEvent};

/// Loyalty below which a rogue act gets the operative burned.
const ROGUE_CAUGHT_BELOW: i32 = 30;
const AGENT_SUMMARY_CHARS: usize = 200;
const LOG_SUMMARY_CHARS: usize = 150;
const EVENT_TRUST_GAIN: i32 = 2;
const EXTRACTION_EXPOSURE: i32 = 5;

/// Every delta applied for one operative response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionChanges {
    pub codename: String,
    pub decision: DecisionKind,
    pub loyalty_shift: i32,
    pub extra_loyalty_shift: i32,
    pub tension_impact: i32,
    pub exposure_impact: i32,
    pub trust_impact: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_change: Option<AgentStatus>,
}

impl DecisionChanges {
    /// Summary for a response that was not applied.
    pub fn none(codename: &str, decision: DecisionKind) -> Self {
        Self {
            codename: codename.to_string(),
            decision,
            loyalty_shift: 0,
            extra_loyalty_shift: 0,
            tension_impact: 0,
            exposure_impact: 0,
            trust_impact: 0,
            status_change: None,
        }
    }

    pub fn total_loyalty_shift(&self) -> i32 {
        self.loyalty_shift + self.extra_loyalty_shift
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventResponse {
    pub action_taken: String,
    pub event_title: String,
    pub trust_change: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub codename: String,
    pub exposure_increase: i32,
    pub message: String,
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Decision engine over a storage backend.
pub struct DecisionEngine<'a> {
    storage: &'a dyn Storage,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Apply an operative's hidden decision and log the mission.
    ///
    /// Operative records are saved as each change lands; the world record is
    /// saved once at the end.
    pub fn process_operative_response(
        &self,
        codename: &str,
        order: &str,
        response: &OperativeResponse,
        mission_type: &str,
    ) -> GameResult<DecisionChanges> {
        let registry = AgentRegistry::new(self.storage);
        let hidden = &response.hidden_meta;
        let agent = registry.load(codename)?;
        let mut state = self.storage.load_state()?;

        let mut changes = DecisionChanges::none(codename, hidden.decision.clone());
        changes.loyalty_shift = hidden.loyalty_shift;
        changes.tension_impact = hidden.tension_impact;
        changes.exposure_impact = hidden.exposure_impact;

        if hidden.loyalty_shift != 0 {
            registry.update_loyalty(codename, hidden.loyalty_shift)?;
        }

        let extra = hidden.decision.loyalty_effect();
        if extra != 0 {
            registry.update_loyalty(codename, extra)?;
            changes.extra_loyalty_shift = extra;
        }

        if hidden.tension_impact != 0 && state.region(&agent.region).is_some() {
            state.update_region_tension(&agent.region, hidden.tension_impact);
        }

        if hidden.exposure_impact != 0 {
            state.update_exposure(hidden.exposure_impact);
        }

        let trust = hidden.decision.trust_effect();
        if trust != 0 {
            state.update_trust(trust);
            changes.trust_impact = trust;
        }

        if hidden.decision == DecisionKind::Rogue {
            let current = registry.load(codename)?;
            if current.loyalty < ROGUE_CAUGHT_BELOW {
                registry.set_status(codename, AgentStatus::Dark)?;
                state.mark_compromised(codename);
                changes.status_change = Some(AgentStatus::Dark);
            }
        }

        registry.log_mission(
            codename,
            MissionRecord {
                id: format!("mission_{}_{}", state.turn, codename),
                turn: state.turn,
                order_received: order.to_string(),
                decision: hidden.decision.to_string(),
                reason_hidden: hidden.reason.clone(),
                reported_to_director: truncate_chars(&response.response, AGENT_SUMMARY_CHARS),
                outcome: format!(
                    "Decision: {}, loyalty shift: {}",
                    hidden.decision,
                    changes.total_loyalty_shift()
                ),
            },
        )?;

        state.append_mission(MissionLogEntry {
            turn: state.turn,
            operative: codename.to_string(),
            order: order.to_string(),
            response_summary: truncate_chars(&response.response, LOG_SUMMARY_CHARS),
            mission_type: mission_type.to_string(),
        });

        self.storage.save_state(&state)?;

        tracing::info!(
            codename = %codename,
            decision = %hidden.decision,
            "Processed operative response"
        );
        Ok(changes)
    }

    /// Director engagement with a world event. Any action earns trust.
    pub fn process_event_response(
        &self,
        action: &str,
        event: &WorldEvent,
    ) -> GameResult<EventResponse> {
        let mut state = self.storage.load_state()?;
        state.update_trust(EVENT_TRUST_GAIN);
        self.storage.save_state(&state)?;

        tracing::info!(event = %event.event_title, "Director responded to event");
        Ok(EventResponse {
            action_taken: action.to_string(),
            event_title: event.event_title.clone(),
            trust_change: EVENT_TRUST_GAIN,
        })
    }

    /// Pull an operative out of the field.
    ///
    /// Not guarded by status: extracting twice charges exposure twice.
    pub fn handle_extraction_order(&self, codename: &str) -> GameResult<Extraction> {
        let registry = AgentRegistry::new(self.storage);
        let agent = registry.set_status(codename, AgentStatus::Extracted)?;

        let mut state = self.storage.load_state()?;
        state.update_exposure(EXTRACTION_EXPOSURE);
        state.clear_compromised(codename);
        self.storage.save_state(&state)?;

        let region = state
            .region(&agent.region)
            .map(|r| r.name.as_str())
            .unwrap_or("unknown");

        tracing::info!(codename = %codename, "Operative extracted");
        Ok(Extraction {
            codename: codename.to_string(),
            exposure_increase: EXTRACTION_EXPOSURE,
            message: format!(
                "{codename} has been extracted from the field. Cover identities burned. \
                 Network in {region} region will need to be rebuilt."
            ),
        })
    }
}
