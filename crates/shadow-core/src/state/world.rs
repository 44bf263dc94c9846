//! World state - regions, exposure, trust and the global logs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GameOverConfig;
use crate::rogue::RogueEvent;

/// Clamp a bounded gauge after applying `delta`.
pub fn clamp_gauge(old: i32, delta: i32) -> i32 {
    old.saturating_add(delta).clamp(0, 100)
}

/// A monitored region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub tension: i32,
}

/// Overall danger classification, derived from tension and exposure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    #[default]
    Low,
    Moderate,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn from_composite(composite: f64) -> Self {
        if composite >= 80.0 {
            Self::Critical
        } else if composite >= 60.0 {
            Self::High
        } else if composite >= 40.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry in the global mission log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionLogEntry {
    pub turn: u32,
    pub operative: String,
    pub order: String,
    pub response_summary: String,
    #[serde(default = "default_mission_type")]
    pub mission_type: String,
}

fn default_mission_type() -> String {
    "field_operation".to_string()
}

/// A geopolitical event staged at turn start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    #[serde(default = "default_event_title")]
    pub event_title: String,
    #[serde(default)]
    pub event_description: String,
    #[serde(default)]
    pub affected_region: Option<String>,
    #[serde(default)]
    pub tension_impact: i32,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Threat level in force when the event was staged
    #[serde(default)]
    pub threat_at_time: Option<ThreatLevel>,
}

fn default_event_title() -> String {
    "Unknown Event".to_string()
}

/// Which game-over condition fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverKind {
    Exposure,
    Trust,
    AllCompromised,
    CriticalCascade,
}

impl GameOverKind {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Exposure => {
                "AGENCY EXPOSED — Your operations have been uncovered. Foreign intelligence \
                 agencies have identified your entire network. All operatives are being recalled \
                 or have gone dark."
            }
            Self::Trust => {
                "DIRECTOR REMOVED — The oversight committee has lost all confidence in your \
                 leadership. You've been relieved of command effective immediately."
            }
            Self::AllCompromised => {
                "NETWORK COLLAPSED — Every single operative in your network has been \
                 compromised. There is no one left to trust. The Shadow Network is finished."
            }
            Self::CriticalCascade => {
                "WORLD CRISIS — Multiple regions have spiraled beyond control. Global tensions \
                 have escalated to the point of open conflict. Your agency failed to prevent \
                 catastrophe."
            }
        }
    }
}

/// Terminal result carried by every life-cycle operation once the game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    #[serde(rename = "type")]
    pub kind: GameOverKind,
    pub reason: String,
}

impl GameOver {
    pub fn new(kind: GameOverKind) -> Self {
        Self {
            kind,
            reason: kind.headline().to_string(),
        }
    }
}

/// The singleton simulation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub turn: u32,
    pub regions: BTreeMap<String, Region>,
    #[serde(default)]
    pub threat_level: ThreatLevel,
    pub agency_exposure_level: i32,
    pub director_trust_score: i32,
    #[serde(default)]
    pub compromised_assets: Vec<String>,
    #[serde(default)]
    pub mission_log: Vec<MissionLogEntry>,
    #[serde(default)]
    pub world_events: Vec<WorldEvent>,
    #[serde(default)]
    pub rogue_events: Vec<RogueEvent>,
}

/// What the director is allowed to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicWorldState {
    pub turn: u32,
    pub regions: BTreeMap<String, Region>,
    pub threat_level: ThreatLevel,
    pub agency_exposure_level: i32,
    pub director_trust_score: i32,
    pub compromised_assets: Vec<String>,
}

impl WorldState {
    /// Bring a freshly loaded record back inside its invariants.
    pub fn repair(&mut self) {
        self.turn = self.turn.max(1);
        for region in self.regions.values_mut() {
            region.tension = region.tension.clamp(0, 100);
        }
        self.agency_exposure_level = self.agency_exposure_level.clamp(0, 100);
        self.director_trust_score = self.director_trust_score.clamp(0, 100);

        let mut seen = Vec::with_capacity(self.compromised_assets.len());
        self.compromised_assets.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
    }

    pub fn region(&self, key: &str) -> Option<&Region> {
        self.regions.get(key)
    }

    /// Adjust a region's tension. Unknown regions are ignored.
    pub fn update_region_tension(&mut self, key: &str, delta: i32) {
        if let Some(region) = self.regions.get_mut(key) {
            let old = region.tension;
            region.tension = clamp_gauge(old, delta);
            tracing::info!(region = %key, old, new = region.tension, "Region tension updated");
        }
    }

    pub fn update_exposure(&mut self, delta: i32) {
        let old = self.agency_exposure_level;
        self.agency_exposure_level = clamp_gauge(old, delta);
        tracing::info!(old, new = self.agency_exposure_level, "Agency exposure updated");
    }

    pub fn update_trust(&mut self, delta: i32) {
        let old = self.director_trust_score;
        self.director_trust_score = clamp_gauge(old, delta);
        tracing::info!(old, new = self.director_trust_score, "Director trust updated");
    }

    /// Returns false if the asset was already listed.
    pub fn mark_compromised(&mut self, codename: &str) -> bool {
        if self.is_compromised(codename) {
            return false;
        }
        self.compromised_assets.push(codename.to_string());
        tracing::warn!(codename = %codename, "Asset compromised");
        true
    }

    /// Returns false if the asset was not listed.
    pub fn clear_compromised(&mut self, codename: &str) -> bool {
        let before = self.compromised_assets.len();
        self.compromised_assets.retain(|id| id != codename);
        before != self.compromised_assets.len()
    }

    pub fn is_compromised(&self, codename: &str) -> bool {
        self.compromised_assets.iter().any(|id| id == codename)
    }

    pub fn append_mission(&mut self, entry: MissionLogEntry) {
        self.mission_log.push(entry);
    }

    /// Append an event, keeping only the newest `cap` entries.
    pub fn append_world_event(&mut self, event: WorldEvent, cap: usize) {
        self.world_events.push(event);
        if self.world_events.len() > cap {
            let excess = self.world_events.len() - cap;
            self.world_events.drain(0..excess);
        }
    }

    pub fn append_rogue_event(&mut self, event: RogueEvent) {
        self.rogue_events.push(event);
    }

    /// Composite of mean regional tension (60%) and exposure (40%).
    pub fn threat_composite(&self) -> f64 {
        let mean_tension = if self.regions.is_empty() {
            0.0
        } else {
            let total: i32 = self.regions.values().map(|r| r.tension).sum();
            total as f64 / self.regions.len() as f64
        };
        mean_tension * 0.6 + self.agency_exposure_level as f64 * 0.4
    }

    pub fn compute_threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_composite(self.threat_composite())
    }

    /// Move to the next turn and refresh the stored threat level.
    pub fn advance_turn(&mut self) {
        self.turn += 1;
        self.threat_level = self.compute_threat_level();
        tracing::info!(turn = self.turn, threat = %self.threat_level, "Turn advanced");
    }

    /// First satisfied game-over condition, in priority order.
    pub fn check_game_over(&self, limits: &GameOverConfig, roster_size: usize) -> Option<GameOver> {
        if self.agency_exposure_level >= limits.exposure_limit {
            return Some(GameOver::new(GameOverKind::Exposure));
        }
        if self.director_trust_score <= limits.trust_floor {
            return Some(GameOver::new(GameOverKind::Trust));
        }
        if self.compromised_assets.len() >= roster_size {
            return Some(GameOver::new(GameOverKind::AllCompromised));
        }
        let critical = self
            .world_events
            .iter()
            .filter(|e| e.threat_at_time == Some(ThreatLevel::Critical))
            .count();
        if critical >= limits.critical_event_limit {
            return Some(GameOver::new(GameOverKind::CriticalCascade));
        }
        None
    }

    pub fn public_view(&self) -> PublicWorldState {
        PublicWorldState {
            turn: self.turn,
            regions: self.regions.clone(),
            threat_level: self.threat_level,
            agency_exposure_level: self.agency_exposure_level,
            director_trust_score: self.director_trust_score,
            compromised_assets: self.compromised_assets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(tensions: &[i32], exposure: i32, trust: i32) -> WorldState {
        let regions = tensions
            .iter()
            .enumerate()
            .map(|(i, t)| {
                (
                    format!("region_{i}"),
                    Region {
                        name: format!("Region {i}"),
                        tension: *t,
                    },
                )
            })
            .collect();
        WorldState {
            turn: 1,
            regions,
            threat_level: ThreatLevel::Low,
            agency_exposure_level: exposure,
            director_trust_score: trust,
            compromised_assets: Vec::new(),
            mission_log: Vec::new(),
            world_events: Vec::new(),
            rogue_events: Vec::new(),
        }
    }

    fn event(threat: Option<ThreatLevel>) -> WorldEvent {
        WorldEvent {
            event_title: "Border incident".into(),
            event_description: String::new(),
            affected_region: None,
            tension_impact: 0,
            suggested_actions: Vec::new(),
            turn: 1,
            timestamp: None,
            threat_at_time: threat,
        }
    }

    #[test]
    fn gauges_clamp_on_overflow() {
        let mut w = world(&[95], 95, 5);
        w.update_region_tension("region_0", 50);
        w.update_exposure(50);
        w.update_trust(-50);
        assert_eq!(w.regions["region_0"].tension, 100);
        assert_eq!(w.agency_exposure_level, 100);
        assert_eq!(w.director_trust_score, 0);

        w.update_exposure(i32::MIN);
        assert_eq!(w.agency_exposure_level, 0);
        w.update_trust(i32::MAX);
        assert_eq!(w.director_trust_score, 100);
    }

    #[test]
    fn unknown_region_is_ignored() {
        let mut w = world(&[10], 0, 50);
        w.update_region_tension("atlantis", 40);
        assert_eq!(w.regions.len(), 1);
        assert_eq!(w.regions["region_0"].tension, 10);
    }

    #[test]
    fn threat_level_thresholds() {
        assert_eq!(world(&[80, 80], 80, 50).compute_threat_level(), ThreatLevel::Critical);
        assert_eq!(world(&[0, 0], 0, 50).compute_threat_level(), ThreatLevel::Low);
        assert_eq!(world(&[], 0, 50).compute_threat_level(), ThreatLevel::Low);
        assert_eq!(world(&[], 100, 50).compute_threat_level(), ThreatLevel::Moderate);

        // 0.6 * 60 + 0.4 * 10 = 40 exactly
        assert_eq!(world(&[60], 10, 50).compute_threat_level(), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_composite(39.99), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_composite(40.0), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_composite(59.99), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_composite(60.0), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_composite(79.99), ThreatLevel::High);
    }

    #[test]
    fn threat_level_only_refreshes_on_advance() {
        let mut w = world(&[90, 90], 90, 50);
        assert_eq!(w.threat_level, ThreatLevel::Low);
        w.advance_turn();
        assert_eq!(w.turn, 2);
        assert_eq!(w.threat_level, ThreatLevel::Critical);
    }

    #[test]
    fn compromised_assets_stay_unique() {
        let mut w = world(&[], 0, 50);
        assert!(w.mark_compromised("GHOST"));
        assert!(!w.mark_compromised("GHOST"));
        assert_eq!(w.compromised_assets, vec!["GHOST".to_string()]);
        assert!(w.clear_compromised("GHOST"));
        assert!(!w.clear_compromised("GHOST"));
    }

    #[test]
    fn world_event_history_is_capped() {
        let mut w = world(&[], 0, 50);
        for turn in 1..=25 {
            let mut e = event(None);
            e.turn = turn;
            w.append_world_event(e, 20);
        }
        assert_eq!(w.world_events.len(), 20);
        assert_eq!(w.world_events.first().map(|e| e.turn), Some(6));
        assert_eq!(w.world_events.last().map(|e| e.turn), Some(25));
    }

    #[test]
    fn game_over_priority() {
        let limits = GameOverConfig::default();

        let both = world(&[], 100, 0);
        assert_eq!(
            both.check_game_over(&limits, 5).map(|g| g.kind),
            Some(GameOverKind::Exposure)
        );

        let trust = world(&[], 50, 0);
        assert_eq!(
            trust.check_game_over(&limits, 5).map(|g| g.kind),
            Some(GameOverKind::Trust)
        );

        let mut network = world(&[], 50, 50);
        for id in ["A", "B"] {
            network.mark_compromised(id);
        }
        assert_eq!(
            network.check_game_over(&limits, 2).map(|g| g.kind),
            Some(GameOverKind::AllCompromised)
        );
        assert!(network.check_game_over(&limits, 3).is_none());
    }

    #[test]
    fn critical_cascade_counts_recorded_threat() {
        let limits = GameOverConfig::default();
        let mut w = world(&[], 10, 50);
        w.append_world_event(event(Some(ThreatLevel::Critical)), 20);
        w.append_world_event(event(Some(ThreatLevel::High)), 20);
        w.append_world_event(event(Some(ThreatLevel::Critical)), 20);
        assert!(w.check_game_over(&limits, 5).is_none());

        w.append_world_event(event(Some(ThreatLevel::Critical)), 20);
        let over = w.check_game_over(&limits, 5).unwrap();
        assert_eq!(over.kind, GameOverKind::CriticalCascade);
        assert!(over.reason.starts_with("WORLD CRISIS"));
    }

    #[test]
    fn repair_restores_invariants() {
        let mut w = world(&[140], -5, 300);
        w.turn = 0;
        w.compromised_assets = vec!["A".into(), "B".into(), "A".into()];
        w.repair();
        assert_eq!(w.turn, 1);
        assert_eq!(w.regions["region_0"].tension, 100);
        assert_eq!(w.agency_exposure_level, 0);
        assert_eq!(w.director_trust_score, 100);
        assert_eq!(w.compromised_assets, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn game_over_serializes_with_type_tag() {
        let json = serde_json::to_value(GameOver::new(GameOverKind::AllCompromised)).unwrap();
        assert_eq!(json["type"], "all_compromised");
        assert!(json["reason"].as_str().unwrap().starts_with("NETWORK COLLAPSED"));
    }
}
