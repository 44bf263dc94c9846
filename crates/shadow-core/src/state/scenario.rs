//! Opening scenario - the records a new game is seeded with.

use std::collections::BTreeMap;

use super::agent::{Agent, AgentStatus};
use super::world::{Region, ThreatLevel, WorldState};

fn region(name: &str, tension: i32) -> Region {
    Region {
        name: name.to_string(),
        tension,
    }
}

/// Turn 1 of the default campaign.
pub fn default_world() -> WorldState {
    let regions = BTreeMap::from([
        ("middle_east".to_string(), region("Middle East", 55)),
        ("eastern_europe".to_string(), region("Eastern Europe", 45)),
        ("south_asia".to_string(), region("South Asia", 40)),
        ("east_asia".to_string(), region("East Asia", 35)),
    ]);

    let mut world = WorldState {
        turn: 1,
        regions,
        threat_level: ThreatLevel::Low,
        agency_exposure_level: 10,
        director_trust_score: 60,
        compromised_assets: Vec::new(),
        mission_log: Vec::new(),
        world_events: Vec::new(),
        rogue_events: Vec::new(),
    };
    world.threat_level = world.compute_threat_level();
    world
}

fn agent(
    codename: &str,
    loyalty: i32,
    location: &str,
    region: &str,
    ties: &[(&str, &str)],
) -> Agent {
    Agent {
        codename: codename.to_string(),
        loyalty,
        current_status: AgentStatus::Active,
        location: location.to_string(),
        region: region.to_string(),
        relationships: ties
            .iter()
            .map(|(peer, desc)| (peer.to_string(), desc.to_string()))
            .collect(),
        known_compromises: Vec::new(),
        missions: Vec::new(),
    }
}

/// The five-operative roster matching the default configuration.
pub fn default_agents() -> Vec<Agent> {
    vec![
        agent(
            "NIGHTHAWK",
            72,
            "Beirut",
            "middle_east",
            &[
                (
                    "CEDAR",
                    "Shares the Levant network. Respects CEDAR's discipline, dislikes the rivalry.",
                ),
                ("SABLE", "Trained together years ago. Wary of SABLE's methods."),
            ],
        ),
        agent(
            "CEDAR",
            65,
            "Damascus",
            "middle_east",
            &[
                ("NIGHTHAWK", "Competes with NIGHTHAWK for the same sources."),
                ("GHOST", "Barely knows GHOST. Thinks the kid is a liability."),
            ],
        ),
        agent(
            "GHOST",
            48,
            "Karachi",
            "south_asia",
            &[
                ("CEDAR", "Feels judged by CEDAR."),
                ("LOTUS", "Trusts LOTUS more than anyone at headquarters."),
            ],
        ),
        agent(
            "SABLE",
            58,
            "Kyiv",
            "eastern_europe",
            &[
                ("NIGHTHAWK", "Old partner. Would never admit the debt owed."),
                ("LOTUS", "Professional distance."),
            ],
        ),
        agent(
            "LOTUS",
            80,
            "Shanghai",
            "east_asia",
            &[
                ("GHOST", "Quietly looks out for GHOST."),
                ("SABLE", "Respects SABLE's results, not SABLE's methods."),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn roster_matches_default_config() {
        let config = GameConfig::default();
        let agents = default_agents();
        assert_eq!(agents.len(), config.roster.len());
        for (agent, op) in agents.iter().zip(&config.roster) {
            assert_eq!(agent.codename, op.codename);
            assert_eq!(agent.region, op.region);
        }
    }

    #[test]
    fn every_home_region_exists() {
        let world = default_world();
        for agent in default_agents() {
            assert!(world.region(&agent.region).is_some(), "{} has no region", agent.codename);
        }
        assert!(world.check_game_over(&Default::default(), 5).is_none());
    }
}
