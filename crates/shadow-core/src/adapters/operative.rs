//! Operative agent - in-character replies with a hidden decision attached.

use serde::Serialize;

use super::templates::{render, TemplateSource};
use super::Generator;
use crate::config::GameConfig;
use crate::decision::{parse_hidden_block, strip_hidden_block, HiddenDecision};
use crate::error::GameResult;
use crate::state::{Agent, AgentRegistry, Storage, WorldState};

/// What came back from one operative call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperativeResponse {
    pub codename: String,
    /// Text shown to the director, hidden block removed.
    pub response: String,
    pub hidden_meta: HiddenDecision,
    pub raw_response: String,
    /// The operative could not be reached; nothing should be applied.
    pub error: bool,
}

impl OperativeResponse {
    fn signal_lost(codename: &str, response: String, reason: &str) -> Self {
        Self {
            codename: codename.to_string(),
            response,
            hidden_meta: HiddenDecision::unavailable(reason),
            raw_response: String::new(),
            error: true,
        }
    }
}

fn missions_text(agent: &Agent) -> String {
    if agent.missions.is_empty() {
        return "No missions completed yet. This is your first deployment.".to_string();
    }
    agent
        .missions
        .iter()
        .map(|m| {
            format!(
                "- Turn {}: Ordered '{}' → Decided: {} → Reported: '{}'",
                m.turn, m.order_received, m.decision, m.reported_to_director
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn relationships_text(agent: &Agent) -> String {
    agent
        .relationships
        .iter()
        .map(|(peer, desc)| format!("- {peer}: {desc}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn compromises_text(agent: &Agent) -> String {
    if agent.known_compromises.is_empty() {
        "None known.".to_string()
    } else {
        agent.known_compromises.join(", ")
    }
}

fn world_context(state: &WorldState) -> String {
    let regions = state
        .regions
        .values()
        .map(|r| format!("- {}: Tension {}/100", r.name, r.tension))
        .collect::<Vec<_>>()
        .join("\n");
    let compromised = if state.compromised_assets.is_empty() {
        "None known".to_string()
    } else {
        state.compromised_assets.join(", ")
    };
    format!(
        "Turn: {}\nThreat Level: {}\nRegional Tensions:\n{}\nCompromised Assets: {}\n\
         Agency Exposure: {}/100",
        state.turn, state.threat_level, regions, compromised, state.agency_exposure_level
    )
}

/// Operative agent bound to one session's collaborators.
pub struct OperativeAgent<'a> {
    generator: &'a dyn Generator,
    templates: &'a dyn TemplateSource,
    storage: &'a dyn Storage,
    config: &'a GameConfig,
}

impl<'a> OperativeAgent<'a> {
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

    /// System prompt for `codename`, with memory and world context injected.
    pub fn build_prompt(&self, codename: &str) -> GameResult<String> {
        let agent = AgentRegistry::new(self.storage).load(codename)?;
        self.prompt_for(&agent)
    }

    fn prompt_for(&self, agent: &Agent) -> GameResult<String> {
        let template = self.templates.load(&agent.codename.to_lowercase())?;
        let state = self.storage.load_state()?;
        Ok(render(
            &template,
            &[
                ("loyalty", &agent.loyalty.to_string()),
                ("missions", &missions_text(agent)),
                ("relationships", &relationships_text(agent)),
                ("known_compromises", &compromises_text(agent)),
                ("world_context", &world_context(&state)),
            ],
        ))
    }

    /// Send an order to an operative.
    ///
    /// Inactive operatives and failed transmissions produce a signal-lost
    /// response flagged with `error` instead of failing.
    pub async fn call(&self, codename: &str, order: &str) -> GameResult<OperativeResponse> {
        let agent = AgentRegistry::new(self.storage).load(codename)?;

        if !agent.is_active() {
            tracing::info!(
                codename = %codename,
                status = %agent.current_status,
                "Operative unreachable"
            );
            return Ok(OperativeResponse::signal_lost(
                codename,
                format!(
                    "[SIGNAL LOST] Unable to reach {codename}. Operative status: {}.",
                    agent.current_status
                ),
                "Operative not active",
            ));
        }

        let system = self.prompt_for(&agent)?;
        let user = format!("ORDER RECEIVED: {order}");

        let raw = match self
            .generator
            .complete(&system, &user, self.config.llm.temperature)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(codename = %codename, error = %e, "Operative call failed");
                return Ok(OperativeResponse::signal_lost(
                    codename,
                    format!(
                        "[SIGNAL LOST] Transmission from {codename} interrupted. \
                         No report received."
                    ),
                    "Transmission failed",
                ));
            }
        };

        Ok(OperativeResponse {
            codename: codename.to_string(),
            response: strip_hidden_block(&raw),
            hidden_meta: parse_hidden_block(&raw),
            raw_response: raw,
            error: false,
        })
    }
}
