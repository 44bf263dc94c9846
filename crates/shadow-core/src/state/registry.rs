//! Agent registry - load-mutate-save operations on operative records.

use crate::error::GameResult;
use crate::rng::RandomSource;

use super::agent::{Agent, AgentStatus, MissionRecord, PublicAgent};
use super::store::Storage;
use super::world::clamp_gauge;

/// Noise applied to loyalty in the director's view.
const SIGNAL_NOISE: i32 = 10;

/// Borrowed view over the operative records in a [`Storage`].
///
/// Each mutation reads the record, changes it and writes it back before
/// returning.
#[derive(Clone, Copy)]
pub struct AgentRegistry<'a> {
    storage: &'a dyn Storage,
}

impl<'a> AgentRegistry<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    pub fn load(&self, codename: &str) -> GameResult<Agent> {
        self.storage.load_agent(codename)
    }

    pub fn save(&self, agent: &Agent) -> GameResult<()> {
        self.storage.save_agent(agent)
    }

    /// Load every listed operative, skipping records that do not exist.
    pub fn load_all(&self, codenames: &[String]) -> GameResult<Vec<Agent>> {
        let mut agents = Vec::with_capacity(codenames.len());
        for codename in codenames {
            match self.load(codename) {
                Ok(agent) => agents.push(agent),
                Err(crate::GameError::AgentNotFound(_)) => {
                    tracing::warn!(codename = %codename, "Operative record not found");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(agents)
    }

    fn modify(&self, codename: &str, f: impl FnOnce(&mut Agent)) -> GameResult<Agent> {
        let mut agent = self.load(codename)?;
        f(&mut agent);
        self.save(&agent)?;
        Ok(agent)
    }

    pub fn update_loyalty(&self, codename: &str, delta: i32) -> GameResult<Agent> {
        self.modify(codename, |agent| {
            let old = agent.loyalty;
            agent.loyalty = clamp_gauge(old, delta);
            tracing::info!(codename = %codename, old, new = agent.loyalty, "Loyalty updated");
        })
    }

    pub fn set_status(&self, codename: &str, status: AgentStatus) -> GameResult<Agent> {
        self.modify(codename, |agent| {
            let old = agent.current_status;
            agent.current_status = status;
            tracing::info!(codename = %codename, %old, new = %status, "Status changed");
        })
    }

    pub fn update_relationship(
        &self,
        codename: &str,
        peer: &str,
        description: &str,
    ) -> GameResult<Agent> {
        self.modify(codename, |agent| {
            agent
                .relationships
                .insert(peer.to_string(), description.to_string());
            tracing::info!(codename = %codename, peer = %peer, "Relationship updated");
        })
    }

    /// Record that `codename` knows `peer` is compromised. Already-known
    /// compromises leave the record untouched.
    pub fn add_known_compromise(&self, codename: &str, peer: &str) -> GameResult<Agent> {
        let mut agent = self.load(codename)?;
        if agent.learn_compromise(peer) {
            self.save(&agent)?;
            tracing::info!(codename = %codename, peer = %peer, "Compromise learned");
        }
        Ok(agent)
    }

    pub fn log_mission(&self, codename: &str, mission: MissionRecord) -> GameResult<Agent> {
        self.modify(codename, |agent| {
            tracing::info!(codename = %codename, mission = %mission.id, "Mission logged");
            agent.missions.push(mission);
        })
    }

    /// Public projection with fresh loyalty noise on every call.
    pub fn public_view(
        &self,
        codename: &str,
        rng: &mut dyn RandomSource,
    ) -> GameResult<PublicAgent> {
        let agent = self.load(codename)?;
        let noise = rng.range_inclusive(-SIGNAL_NOISE, SIGNAL_NOISE);
        Ok(agent.public_view(noise))
    }

    pub fn all_public(
        &self,
        codenames: &[String],
        rng: &mut dyn RandomSource,
    ) -> GameResult<Vec<PublicAgent>> {
        codenames
            .iter()
            .map(|codename| self.public_view(codename, rng))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRandom, ThreadRandom};
    use crate::state::{scenario, MemoryStore};
    use crate::GameError;

    fn store() -> MemoryStore {
        MemoryStore::seeded(&scenario::default_world(), &scenario::default_agents())
    }

    #[test]
    fn loyalty_clamps_at_both_ends() {
        let store = store();
        let registry = AgentRegistry::new(&store);

        let mut lotus = registry.load("LOTUS").unwrap();
        lotus.loyalty = 95;
        registry.save(&lotus).unwrap();
        assert_eq!(registry.update_loyalty("LOTUS", 50).unwrap().loyalty, 100);

        lotus.loyalty = 5;
        registry.save(&lotus).unwrap();
        assert_eq!(registry.update_loyalty("LOTUS", -50).unwrap().loyalty, 0);
        assert_eq!(registry.load("LOTUS").unwrap().loyalty, 0);
    }

    #[test]
    fn known_compromises_have_set_semantics() {
        let store = store();
        let registry = AgentRegistry::new(&store);
        registry.add_known_compromise("CEDAR", "GHOST").unwrap();
        registry.add_known_compromise("CEDAR", "SABLE").unwrap();
        let cedar = registry.add_known_compromise("CEDAR", "GHOST").unwrap();
        assert_eq!(cedar.known_compromises, vec!["GHOST".to_string(), "SABLE".to_string()]);
    }

    #[test]
    fn status_and_relationships_persist() {
        let store = store();
        let registry = AgentRegistry::new(&store);
        registry.set_status("SABLE", AgentStatus::Dark).unwrap();
        registry
            .update_relationship("SABLE", "LOTUS", "No longer answers LOTUS.")
            .unwrap();
        let sable = registry.load("SABLE").unwrap();
        assert_eq!(sable.current_status, AgentStatus::Dark);
        assert_eq!(sable.relationships["LOTUS"], "No longer answers LOTUS.");
    }

    #[test]
    fn unknown_agent_is_not_found() {
        let store = store();
        let registry = AgentRegistry::new(&store);
        let mut rng = ScriptedRandom::constant(0.5);
        assert!(matches!(
            registry.update_loyalty("ZEPHYR", 1),
            Err(GameError::AgentNotFound(_))
        ));
        assert!(matches!(
            registry.public_view("ZEPHYR", &mut rng),
            Err(GameError::AgentNotFound(_))
        ));
    }

    #[test]
    fn load_all_skips_missing_records() {
        let store = store();
        let registry = AgentRegistry::new(&store);
        let names = vec!["GHOST".to_string(), "ZEPHYR".to_string(), "LOTUS".to_string()];
        let agents = registry.load_all(&names).unwrap();
        assert_eq!(agents.len(), 2);
    }

    #[test]
    fn signal_quality_is_noisy_and_bounded() {
        let store = store();
        let registry = AgentRegistry::new(&store);
        let mut ghost = registry.load("GHOST").unwrap();
        ghost.loyalty = 50;
        registry.save(&ghost).unwrap();

        let mut rng = ThreadRandom::new();
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..1000 {
            let view = registry.public_view("GHOST", &mut rng).unwrap();
            assert!((40..=60).contains(&view.signal_quality));
            seen.insert(view.signal_quality);
        }
        // Fresh noise per call, not a cached value.
        assert!(seen.len() > 1);

        let mut rng = ScriptedRandom::new([0.0, 0.999_999]);
        assert_eq!(registry.public_view("GHOST", &mut rng).unwrap().signal_quality, 40);
        assert_eq!(registry.public_view("GHOST", &mut rng).unwrap().signal_quality, 60);
    }
}
