//! Turn-end scan over the roster.
//!
//! Three trigger families are checked per active operative, in order:
//!
//! 1. loyalty below the threshold, then a severity-scaled event
//! 2. home region tension above the threshold, then foreign contact
//! 3. a known compromise, then a warning about the first one known
//!
//! A match in family 1 or 2 ends the checks for that operative. Triggers
//! read a snapshot taken before the scan. Handlers persist their effects as
//! they run; the events themselves are appended to the world record once the
//! scan is done.

use chrono::Utc;

use super::narration::narrate;
use super::{RogueEffects, RogueEvent, RogueEventKind};
use crate::adapters::Generator;
use crate::config::GameConfig;
use crate::error::GameResult;
use crate::rng::RandomSource;
use crate::state::{Agent, AgentRegistry, AgentStatus, Storage};

const SEVERE_BELOW: i32 = 25;
const SERIOUS_BELOW: i32 = 40;

/// Candidate events for a disloyal operative, by loyalty band.
fn loyalty_candidates(loyalty: i32) -> &'static [RogueEventKind] {
    use RogueEventKind::*;
    if loyalty < SEVERE_BELOW {
        &[SilentDefection, DoubleAgentActivation]
    } else if loyalty < SERIOUS_BELOW {
        &[DoubleAgentActivation, UnsanctionedAction, DefectionWarning]
    } else {
        &[DefectionWarning, UnsanctionedAction]
    }
}

pub struct RogueEngine<'a> {
    storage: &'a dyn Storage,
    generator: &'a dyn Generator,
    config: &'a GameConfig,
}

impl<'a> RogueEngine<'a> {
    pub fn new(
        storage: &'a dyn Storage,
        generator: &'a dyn Generator,
        config: &'a GameConfig,
    ) -> Self {
        Self {
            storage,
            generator,
            config,
        }
    }

    /// Scan every roster operative and fire whatever triggers.
    pub async fn run(&self, rng: &mut dyn RandomSource) -> GameResult<Vec<RogueEvent>> {
        let registry = AgentRegistry::new(self.storage);
        let rules = &self.config.rogue;
        let mut events = Vec::new();

        // Effects applied during the pass are not seen until the next one.
        let roster = registry.load_all(&self.config.codenames())?;
        let snapshot = self.storage.load_state()?;

        for agent in &roster {
            if !agent.is_active() {
                continue;
            }

            if agent.loyalty < rules.loyalty_threshold && rng.chance(rules.loyalty_chance) {
                let candidates = loyalty_candidates(agent.loyalty);
                let kind = candidates[rng.pick_index(candidates.len())];
                events.push(self.fire(kind, agent).await?);
                continue;
            }

            if let Some(region) = snapshot.region(&agent.region) {
                if region.tension > rules.tension_threshold && rng.chance(rules.tension_chance) {
                    events.push(self.fire(RogueEventKind::ExternalContact, agent).await?);
                    continue;
                }
            }

            if !agent.known_compromises.is_empty() && rng.chance(rules.relationship_chance) {
                events.push(self.fire(RogueEventKind::CompromiseWarning, agent).await?);
            }
        }

        if !events.is_empty() {
            let mut state = self.storage.load_state()?;
            for event in &events {
                state.append_rogue_event(event.clone());
            }
            self.storage.save_state(&state)?;
        }

        tracing::info!(count = events.len(), "Autonomous trigger pass complete");
        Ok(events)
    }

    async fn fire(&self, kind: RogueEventKind, agent: &Agent) -> GameResult<RogueEvent> {
        let codename = agent.codename.as_str();
        let context = match kind {
            RogueEventKind::DefectionWarning => format!(
                "{codename} is being approached by a foreign intelligence service and has \
                 chosen to warn the Director."
            ),
            RogueEventKind::SilentDefection => format!(
                "{codename} has gone completely dark. No response on any channel. All contact \
                 protocols have failed."
            ),
            RogueEventKind::DoubleAgentActivation => format!(
                "{codename} has been turned. They remain in position but are now feeding false \
                 intelligence while passing real intel to a foreign handler."
            ),
            RogueEventKind::UnsanctionedAction => format!(
                "{codename} has taken an unsanctioned action in the field — acting without \
                 authorization."
            ),
            RogueEventKind::ExternalContact => format!(
                "High regional tension has drawn attention to {codename}'s location. A foreign \
                 intelligence service has made contact."
            ),
            RogueEventKind::CompromiseWarning => format!(
                "{codename} has learned that {} may be compromised and is deciding whether to \
                 warn the Director.",
                agent
                    .known_compromises
                    .first()
                    .map(String::as_str)
                    .unwrap_or("another operative")
            ),
        };
        let narration = narrate(self.generator, kind, codename, &context).await;

        let effects = self.apply(kind, agent)?;
        let turn = self.storage.load_state()?.turn;

        tracing::warn!(codename = %codename, kind = %kind, "Autonomous event triggered");
        Ok(RogueEvent {
            kind,
            codename: codename.to_string(),
            turn,
            timestamp: Utc::now(),
            title: kind.title(codename),
            narration,
            severity: kind.severity(),
            effects,
            hidden: kind == RogueEventKind::DoubleAgentActivation,
        })
    }

    /// Persist the effects of one event.
    fn apply(&self, kind: RogueEventKind, agent: &Agent) -> GameResult<RogueEffects> {
        let registry = AgentRegistry::new(self.storage);
        let codename = agent.codename.as_str();
        let mut state = self.storage.load_state()?;
        let mut effects = RogueEffects::default();

        match kind {
            RogueEventKind::DefectionWarning => {
                registry.update_loyalty(codename, 3)?;
                state.update_exposure(5);
                effects.loyalty_change = Some(3);
                effects.exposure_change = Some(5);
            }
            RogueEventKind::SilentDefection => {
                registry.set_status(codename, AgentStatus::Dark)?;
                state.mark_compromised(codename);
                for other in registry.load_all(&self.config.codenames())? {
                    if other.codename == codename || !other.is_active() {
                        continue;
                    }
                    registry.update_loyalty(&other.codename, -3)?;
                    registry.add_known_compromise(&other.codename, codename)?;
                }
                effects.status = Some(AgentStatus::Dark);
                effects.all_loyalty_change = Some(-3);
                effects.compromised = true;
            }
            RogueEventKind::DoubleAgentActivation => {
                state.mark_compromised(codename);
                state.update_exposure(3);
                effects.compromised = true;
                effects.exposure_change = Some(3);
            }
            RogueEventKind::UnsanctionedAction => {
                registry.update_loyalty(codename, -5)?;
                state.update_exposure(10);
                state.update_region_tension(&agent.region, 8);
                effects.loyalty_change = Some(-5);
                effects.exposure_change = Some(10);
                effects.tension_change = Some(8);
            }
            RogueEventKind::ExternalContact => {
                registry.update_loyalty(codename, -3)?;
                state.update_exposure(3);
                effects.loyalty_change = Some(-3);
                effects.exposure_change = Some(3);
            }
            RogueEventKind::CompromiseWarning => {
                registry.update_loyalty(codename, 2)?;
                effects.loyalty_change = Some(2);
                effects.warned_about = agent.known_compromises.first().cloned();
            }
        }

        self.storage.save_state(&state)?;
        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loyalty_bands() {
        use RogueEventKind::*;
        assert_eq!(loyalty_candidates(0), &[SilentDefection, DoubleAgentActivation]);
        assert_eq!(loyalty_candidates(24), &[SilentDefection, DoubleAgentActivation]);
        assert_eq!(
            loyalty_candidates(25),
            &[DoubleAgentActivation, UnsanctionedAction, DefectionWarning]
        );
        assert_eq!(
            loyalty_candidates(39),
            &[DoubleAgentActivation, UnsanctionedAction, DefectionWarning]
        );
        assert_eq!(loyalty_candidates(40), &[DefectionWarning, UnsanctionedAction]);
        assert_eq!(loyalty_candidates(49), &[DefectionWarning, UnsanctionedAction]);
    }
}
