//! Orchestrator agent - world events, order routing, intel synthesis and
//! turn briefings.
//!
//! Every call degrades to fixed fallback content when generation fails or
//! returns something unusable. Only template and storage failures propagate.

use serde::{Deserialize, Serialize};

use super::templates::{render, TemplateSource};
use super::Generator;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::state::{AgentRegistry, Storage, WorldEvent};

const TEMPLATE: &str = "orchestrator";
const RECENT_MISSIONS: usize = 10;

pub const INTEL_UNAVAILABLE: &str =
    "INTELLIGENCE BRIEFING UNAVAILABLE — Communications disruption detected. \
     Awaiting signal restoration.";
pub const BRIEFING_UNAVAILABLE: &str =
    "SITUATION BRIEFING UNAVAILABLE — Secure channel interference detected. \
     Manual assessment recommended.";

/// Where an order goes and how the orchestrator framed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub target_operative: String,
    pub mission_brief: String,
    pub mission_type: String,
    pub risk_level: String,
}

/// Routing as the model returns it; any field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRouting {
    target_operative: Option<String>,
    mission_brief: Option<String>,
    mission_type: Option<String>,
    risk_level: Option<String>,
}

/// A report handed to intel synthesis.
#[derive(Debug, Clone, Copy)]
pub struct FieldReport<'a> {
    pub codename: &'a str,
    pub response: &'a str,
}

/// Event staged when generation fails.
pub fn fallback_event() -> WorldEvent {
    WorldEvent {
        event_title: "Intelligence Intercept Detected".to_string(),
        event_description: "Signals intelligence has detected unusual communications activity \
            across multiple monitored frequencies. The pattern suggests coordinated movement by an \
            unknown entity. Analysis is ongoing, but the Director should be prepared for rapid \
            developments."
            .to_string(),
        affected_region: Some("middle_east".to_string()),
        tension_impact: 5,
        suggested_actions: vec![
            "Task an operative to investigate the signal source".to_string(),
            "Increase monitoring on all channels".to_string(),
            "Brief all operatives on heightened alert status".to_string(),
        ],
        turn: 0,
        timestamp: None,
        threat_at_time: None,
    }
}

/// Parse a JSON object out of a completion, tolerating code fences or
/// chatter around it.
fn parse_json_object<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str(text.trim()) {
        Ok(value) => Ok(value),
        Err(e) => match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end]),
            _ => Err(e),
        },
    }
}

/// First roster codename mentioned in `text` (case-insensitive), else the
/// first roster entry.
fn scan_for_codename(config: &GameConfig, text: &str) -> String {
    let upper = text.to_uppercase();
    config
        .roster
        .iter()
        .map(|op| op.codename.as_str())
        .find(|codename| upper.contains(codename))
        .unwrap_or_else(|| config.default_operative())
        .to_string()
}

/// Orchestrator bound to one session's collaborators.
pub struct Orchestrator<'a> {
    generator: &'a dyn Generator,
    templates: &'a dyn TemplateSource,
    storage: &'a dyn Storage,
    config: &'a GameConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        templates: &'a dyn TemplateSource,
        storage: &'a dyn Storage,
        config: &'a GameConfig,
    ) -> Self {
        Self {
            generator,
            templates,
            storage,
            config,
        }
    }

    /// System prompt with the public world state, recent missions and the
    /// roster injected.
    pub fn build_prompt(&self) -> GameResult<String> {
        let template = self.templates.load(TEMPLATE)?;
        let state = self.storage.load_state()?;

        let world_state = serde_json::to_string_pretty(&state.public_view())
            .map_err(|e| GameError::corrupt("world_state", e))?;

        let recent = &state.mission_log[state.mission_log.len().saturating_sub(RECENT_MISSIONS)..];
        let mission_log = if recent.is_empty() {
            "No missions completed yet.".to_string()
        } else {
            serde_json::to_string_pretty(recent).map_err(|e| GameError::corrupt("mission_log", e))?
        };

        let registry = AgentRegistry::new(self.storage);
        let operative_list = self
            .config
            .roster
            .iter()
            .map(|op| match registry.load(&op.codename) {
                Ok(agent) => format!(
                    "- {}: Located in {}, Status: {}",
                    op.codename, agent.location, agent.current_status
                ),
                Err(_) => format!("- {}: Status unknown", op.codename),
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(render(
            &template,
            &[
                ("world_state", &world_state),
                ("mission_log", &mission_log),
                ("operative_list", &operative_list),
            ],
        ))
    }

    /// A new geopolitical event shaped by current tensions.
    pub async fn generate_world_event(&self) -> GameResult<WorldEvent> {
        let system = self.build_prompt()?;
        let user = "MODE: GENERATE_EVENT\n\nGenerate a new geopolitical world event based on \
                    current tensions and missions.";

        let result = self
            .generator
            .complete_json(&system, user, self.config.llm.json_temperature)
            .await;
        let event = match result {
            Ok(text) => match parse_json_object::<WorldEvent>(&text) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "World event was not valid JSON, using fallback");
                    fallback_event()
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "World event generation failed, using fallback");
                fallback_event()
            }
        };

        tracing::info!(title = %event.event_title, "World event generated");
        Ok(event)
    }

    /// Pick the operative an order is meant for and frame the brief.
    ///
    /// An unknown target is replaced by the first roster codename named in
    /// the order text, else the first roster entry.
    pub async fn route_order(&self, order: &str) -> GameResult<RoutingDecision> {
        let system = self.build_prompt()?;
        let user = format!(
            "MODE: ROUTE_ORDER\n\nThe Director has issued the following order:\n\"{order}\"\n\n\
             Parse this order, identify the correct target operative, and format a mission brief."
        );

        let parsed = match self
            .generator
            .complete_json(&system, &user, self.config.llm.json_temperature)
            .await
        {
            Ok(text) => parse_json_object::<RawRouting>(&text)
                .inspect_err(|e| tracing::warn!(error = %e, "Routing was not valid JSON"))
                .ok(),
            Err(e) => {
                tracing::error!(error = %e, "Order routing failed");
                None
            }
        };

        let routing = match parsed {
            Some(raw) => {
                let named = raw
                    .target_operative
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| self.config.operative(t).is_some());
                RoutingDecision {
                    target_operative: named
                        .unwrap_or_else(|| scan_for_codename(self.config, order)),
                    mission_brief: raw
                        .mission_brief
                        .filter(|b| !b.trim().is_empty())
                        .unwrap_or_else(|| order.to_string()),
                    mission_type: raw.mission_type.unwrap_or_else(|| "unknown".to_string()),
                    risk_level: raw.risk_level.unwrap_or_else(|| "unknown".to_string()),
                }
            }
            None => RoutingDecision {
                target_operative: scan_for_codename(self.config, order),
                mission_brief: order.to_string(),
                mission_type: "reconnaissance".to_string(),
                risk_level: "medium".to_string(),
            },
        };

        tracing::info!(
            target = %routing.target_operative,
            mission_type = %routing.mission_type,
            "Order routed"
        );
        Ok(routing)
    }

    /// Fold field reports into a briefing for the director.
    pub async fn synthesize_intel(&self, reports: &[FieldReport<'_>]) -> GameResult<String> {
        let system = self.build_prompt()?;
        let reports_text = reports
            .iter()
            .map(|r| format!("=== REPORT FROM {} ===\n{}", r.codename, r.response))
            .collect::<Vec<_>>()
            .join("\n\n");
        let user = format!(
            "MODE: SYNTHESIZE_INTEL\n\nThe following operative reports have been received:\n\n\
             {reports_text}\n\nSynthesize these into a coherent intelligence briefing for the \
             Director."
        );

        match self
            .generator
            .complete(&system, &user, self.config.llm.temperature)
            .await
        {
            Ok(briefing) if !briefing.trim().is_empty() => {
                tracing::info!("Intel synthesis completed");
                Ok(briefing)
            }
            Ok(_) => {
                tracing::warn!("Intel synthesis returned nothing");
                Ok(INTEL_UNAVAILABLE.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "Intel synthesis failed");
                Ok(INTEL_UNAVAILABLE.to_string())
            }
        }
    }

    /// Situation briefing for the start of a turn.
    pub async fn turn_briefing(&self) -> GameResult<String> {
        let system = self.build_prompt()?;
        let user = "MODE: TURN_BRIEFING\n\nGenerate a comprehensive situation briefing for the \
                    Director at the start of this turn. Include threat assessment, regional \
                    summaries, operative status overview, and recommended priorities.";

        match self
            .generator
            .complete(&system, user, self.config.llm.temperature)
            .await
        {
            Ok(briefing) if !briefing.trim().is_empty() => {
                tracing::info!("Turn briefing generated");
                Ok(briefing)
            }
            Ok(_) => Ok(BRIEFING_UNAVAILABLE.to_string()),
            Err(e) => {
                tracing::error!(error = %e, "Turn briefing generation failed");
                Ok(BRIEFING_UNAVAILABLE.to_string())
            }
        }
    }
}
