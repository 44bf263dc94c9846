//! Turn manager - one game session and its turn life cycle.
//!
//! ```text
//! AwaitingTurnStart --start_turn--> TurnActive --issue_order / respond_to_event--> AwaitingTurnEnd
//!        ^                                                                              |
//!        +------------------------------------end_turn----------------------------------+
//!
//! any state --(game-over condition)--> GameOver   (left only through new_game)
//! ```
//!
//! Phases are informational apart from `GameOver`, which short-circuits
//! every life-cycle call. Operations take `&mut self`, so one session
//! serializes its own read-modify-write cycles against storage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::orchestrator::FieldReport;
use crate::adapters::{Generator, OperativeAgent, Orchestrator, RoutingDecision, TemplateSource};
use crate::config::GameConfig;
use crate::decision::{DecisionChanges, DecisionEngine, EventResponse, Extraction};
use crate::error::{GameError, GameResult};
use crate::rng::{RandomSource, ThreadRandom};
use crate::rogue::{RogueEngine, RogueEvent};
use crate::state::{
    AgentRegistry, GameOver, PublicAgent, PublicWorldState, Storage, ThreatLevel, WorldEvent,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingTurnStart,
    TurnActive,
    AwaitingTurnEnd,
    GameOver(GameOver),
}

/// Either the operation ran, or the game had already ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TurnResult<T> {
    Proceed(T),
    GameOver { game_over: GameOver },
}

impl<T> TurnResult<T> {
    pub fn game_over(&self) -> Option<&GameOver> {
        match self {
            Self::Proceed(_) => None,
            Self::GameOver { game_over } => Some(game_over),
        }
    }

    pub fn proceeded(self) -> Option<T> {
        match self {
            Self::Proceed(value) => Some(value),
            Self::GameOver { .. } => None,
        }
    }
}

/// An order and the reply it got, as shown in the transmission log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transmission {
    pub id: Uuid,
    pub turn: u32,
    pub timestamp: DateTime<Utc>,
    pub codename: String,
    pub order: String,
    pub response: String,
    pub mission_type: String,
    pub risk_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnStart {
    pub turn: u32,
    pub event: WorldEvent,
    pub briefing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderOutcome {
    pub transmission: Transmission,
    pub routing: RoutingDecision,
    pub intel_report: String,
    pub changes: DecisionChanges,
    pub game_over: Option<GameOver>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnEnd {
    pub new_turn: u32,
    pub threat_level: ThreatLevel,
    pub rogue_events: Vec<RogueEvent>,
    pub game_over: Option<GameOver>,
}

/// Prefix an order with the operative it is meant for, if one was named.
pub fn address_order(operative: Option<&str>, order: &str) -> String {
    match operative.map(str::trim).filter(|op| !op.is_empty()) {
        Some(op) => format!("{}: {order}", op.to_uppercase()),
        None => order.to_string(),
    }
}

/// A running game.
pub struct TurnManager {
    config: GameConfig,
    storage: Box<dyn Storage>,
    generator: Arc<dyn Generator>,
    templates: Box<dyn TemplateSource>,
    rng: Box<dyn RandomSource>,
    phase: TurnPhase,
    current_event: Option<WorldEvent>,
    current_briefing: String,
    transmissions: Vec<Transmission>,
    rogue_events: Vec<RogueEvent>,
}

impl TurnManager {
    pub fn new(
        config: GameConfig,
        storage: Box<dyn Storage>,
        generator: Arc<dyn Generator>,
        templates: Box<dyn TemplateSource>,
    ) -> Self {
        Self {
            config,
            storage,
            generator,
            templates,
            rng: Box::new(ThreadRandom::new()),
            phase: TurnPhase::AwaitingTurnStart,
            current_event: None,
            current_briefing: String::new(),
            transmissions: Vec::new(),
            rogue_events: Vec::new(),
        }
    }

    /// Replace the random source used for rolls and signal noise.
    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    pub fn current_event(&self) -> Option<&WorldEvent> {
        self.current_event.as_ref()
    }

    pub fn current_briefing(&self) -> &str {
        &self.current_briefing
    }

    pub fn transmissions(&self) -> &[Transmission] {
        &self.transmissions
    }

    /// Autonomous events from the last turn end.
    pub fn rogue_events(&self) -> &[RogueEvent] {
        &self.rogue_events
    }

    /// Current game-over condition, if any. Moves the session to `GameOver`
    /// when one is found.
    pub fn check_game_over(&mut self) -> GameResult<Option<GameOver>> {
        if let TurnPhase::GameOver(over) = &self.phase {
            return Ok(Some(over.clone()));
        }
        let state = self.storage.load_state()?;
        let over = state.check_game_over(&self.config.game_over, self.config.roster.len());
        if let Some(over) = &over {
            tracing::warn!(kind = ?over.kind, "Game over");
            self.phase = TurnPhase::GameOver(over.clone());
        }
        Ok(over)
    }

    /// Stage a world event and brief the director.
    pub async fn start_turn(&mut self) -> GameResult<TurnResult<TurnStart>> {
        if let Some(game_over) = self.check_game_over()? {
            return Ok(TurnResult::GameOver { game_over });
        }

        let orchestrator = Orchestrator::new(
            self.generator.as_ref(),
            self.templates.as_ref(),
            self.storage.as_ref(),
            &self.config,
        );

        let state = self.storage.load_state()?;
        let mut event = orchestrator.generate_world_event().await?;
        event.turn = state.turn;
        event.timestamp = Some(Utc::now());
        event.threat_at_time = Some(state.threat_level);

        if let Some(region) = event.affected_region.as_deref() {
            if event.tension_impact != 0 {
                let mut state = self.storage.load_state()?;
                state.update_region_tension(region, event.tension_impact);
                self.storage.save_state(&state)?;
            }
        }

        let mut state = self.storage.load_state()?;
        state.append_world_event(event.clone(), self.config.world_event_history);
        self.storage.save_state(&state)?;

        let briefing = orchestrator.turn_briefing().await?;

        tracing::info!(turn = state.turn, event = %event.event_title, "Turn started");
        self.current_event = Some(event.clone());
        self.current_briefing = briefing.clone();
        self.phase = TurnPhase::TurnActive;

        Ok(TurnResult::Proceed(TurnStart {
            turn: state.turn,
            event,
            briefing,
        }))
    }

    /// Route an order, deliver it and apply the operative's hidden decision.
    pub async fn issue_order(&mut self, order: &str) -> GameResult<TurnResult<OrderOutcome>> {
        if let Some(game_over) = self.check_game_over()? {
            return Ok(TurnResult::GameOver { game_over });
        }

        let turn = self.storage.load_state()?.turn;
        let orchestrator = Orchestrator::new(
            self.generator.as_ref(),
            self.templates.as_ref(),
            self.storage.as_ref(),
            &self.config,
        );
        let operative = OperativeAgent::new(
            self.generator.as_ref(),
            self.templates.as_ref(),
            self.storage.as_ref(),
            &self.config,
        );

        let routing = orchestrator.route_order(order).await?;
        let target = routing.target_operative.clone();
        let response = operative.call(&target, &routing.mission_brief).await?;

        let changes = if response.error {
            DecisionChanges::none(&target, response.hidden_meta.decision.clone())
        } else {
            DecisionEngine::new(self.storage.as_ref()).process_operative_response(
                &target,
                order,
                &response,
                &routing.mission_type,
            )?
        };

        let transmission = Transmission {
            id: Uuid::new_v4(),
            turn,
            timestamp: Utc::now(),
            codename: target.clone(),
            order: order.to_string(),
            response: response.response.clone(),
            mission_type: routing.mission_type.clone(),
            risk_level: routing.risk_level.clone(),
        };
        self.transmissions.push(transmission.clone());

        let intel_report = orchestrator
            .synthesize_intel(&[FieldReport {
                codename: &target,
                response: &response.response,
            }])
            .await?;

        if self.phase == TurnPhase::TurnActive {
            self.phase = TurnPhase::AwaitingTurnEnd;
        }
        let game_over = self.check_game_over()?;

        Ok(TurnResult::Proceed(OrderOutcome {
            transmission,
            routing,
            intel_report,
            changes,
            game_over,
        }))
    }

    /// Order addressed to a named operative.
    pub async fn issue_order_to(
        &mut self,
        codename: &str,
        order: &str,
    ) -> GameResult<TurnResult<OrderOutcome>> {
        self.issue_order(&address_order(Some(codename), order)).await
    }

    /// Director's answer to the staged world event.
    pub fn respond_to_event(&mut self, action: &str) -> GameResult<TurnResult<EventResponse>> {
        if let Some(game_over) = self.check_game_over()? {
            return Ok(TurnResult::GameOver { game_over });
        }
        let event = self.current_event.as_ref().ok_or(GameError::NoActiveEvent)?;
        let result =
            DecisionEngine::new(self.storage.as_ref()).process_event_response(action, event)?;
        if self.phase == TurnPhase::TurnActive {
            self.phase = TurnPhase::AwaitingTurnEnd;
        }
        Ok(TurnResult::Proceed(result))
    }

    /// Run the autonomous pass and advance the turn.
    pub async fn end_turn(&mut self) -> GameResult<TurnResult<TurnEnd>> {
        if let Some(game_over) = self.check_game_over()? {
            return Ok(TurnResult::GameOver { game_over });
        }

        let rogue = RogueEngine::new(self.storage.as_ref(), self.generator.as_ref(), &self.config);
        let events = rogue.run(self.rng.as_mut()).await?;
        self.rogue_events = events.clone();

        let mut state = self.storage.load_state()?;
        state.advance_turn();
        self.storage.save_state(&state)?;

        self.phase = TurnPhase::AwaitingTurnStart;
        let game_over = self.check_game_over()?;

        Ok(TurnResult::Proceed(TurnEnd {
            new_turn: state.turn,
            threat_level: state.threat_level,
            rogue_events: events,
            game_over,
        }))
    }

    /// Pull an operative out of the field.
    pub fn extract(&mut self, codename: &str) -> GameResult<Extraction> {
        let codename = self.roster_codename(codename)?;
        DecisionEngine::new(self.storage.as_ref()).handle_extraction_order(&codename)
    }

    /// Restore the initial snapshot and forget this session's history.
    pub fn new_game(&mut self) -> GameResult<PublicWorldState> {
        self.storage.reset()?;
        self.current_event = None;
        self.current_briefing.clear();
        self.transmissions.clear();
        self.rogue_events.clear();
        self.phase = TurnPhase::AwaitingTurnStart;
        tracing::info!("New game started");
        self.world_state()
    }

    pub fn world_state(&self) -> GameResult<PublicWorldState> {
        Ok(self.storage.load_state()?.public_view())
    }

    /// Every roster operative, with fresh signal noise.
    pub fn agents(&mut self) -> GameResult<Vec<PublicAgent>> {
        AgentRegistry::new(self.storage.as_ref())
            .all_public(&self.config.codenames(), self.rng.as_mut())
    }

    pub fn agent(&mut self, codename: &str) -> GameResult<PublicAgent> {
        let codename = self.roster_codename(codename)?;
        AgentRegistry::new(self.storage.as_ref()).public_view(&codename, self.rng.as_mut())
    }

    /// Caller-supplied codename, checked against the roster before any storage access.
    fn roster_codename(&self, codename: &str) -> GameResult<String> {
        let codename = codename.trim().to_uppercase();
        match self.config.operative(&codename) {
            Some(op) => Ok(op.codename.clone()),
            None => Err(GameError::AgentNotFound(codename)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_are_addressed_in_upper_case() {
        assert_eq!(address_order(Some("ghost"), "check the docks"), "GHOST: check the docks");
        assert_eq!(address_order(Some("  "), "check the docks"), "check the docks");
        assert_eq!(address_order(None, "check the docks"), "check the docks");
    }

    #[test]
    fn game_over_result_serializes_flat() {
        let result: TurnResult<TurnStart> = TurnResult::GameOver {
            game_over: GameOver::new(crate::state::GameOverKind::Trust),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["game_over"]["type"], "trust");
        assert!(result.game_over().is_some());
    }
}
