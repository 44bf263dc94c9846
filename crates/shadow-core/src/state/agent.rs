//! Operative model - loyalty, status and field memory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Dark,
    Compromised,
    Extracted,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dark => "dark",
            Self::Compromised => "compromised",
            Self::Extracted => "extracted",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed order, as remembered by the operative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub id: String,
    pub turn: u32,
    pub order_received: String,
    pub decision: String,
    pub reason_hidden: String,
    pub reported_to_director: String,
    pub outcome: String,
}

/// A field operative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub codename: String,
    pub loyalty: i32,
    #[serde(default)]
    pub current_status: AgentStatus,
    pub location: String,
    pub region: String,
    #[serde(default)]
    pub relationships: BTreeMap<String, String>,
    #[serde(default)]
    pub known_compromises: Vec<String>,
    #[serde(default)]
    pub missions: Vec<MissionRecord>,
}

/// The director's view of an operative: loyalty is replaced by a noisy
/// signal quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicAgent {
    pub codename: String,
    pub location: String,
    pub region: String,
    pub status: AgentStatus,
    pub signal_quality: i32,
    pub mission_count: usize,
}

impl Agent {
    pub fn is_active(&self) -> bool {
        self.current_status == AgentStatus::Active
    }

    /// Clamp loyalty and drop duplicate known compromises.
    pub fn repair(&mut self) {
        self.loyalty = self.loyalty.clamp(0, 100);
        let mut seen: Vec<String> = Vec::with_capacity(self.known_compromises.len());
        self.known_compromises.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
    }

    /// Returns false if the compromise was already known.
    pub fn learn_compromise(&mut self, codename: &str) -> bool {
        if self.known_compromises.iter().any(|id| id == codename) {
            return false;
        }
        self.known_compromises.push(codename.to_string());
        true
    }

    pub fn public_view(&self, noise: i32) -> PublicAgent {
        PublicAgent {
            codename: self.codename.clone(),
            location: self.location.clone(),
            region: self.region.clone(),
            status: self.current_status,
            signal_quality: (self.loyalty + noise).clamp(0, 100),
            mission_count: self.missions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_lowercase_names() {
        let json = serde_json::to_string(&AgentStatus::Extracted).unwrap();
        assert_eq!(json, "\"extracted\"");
        let parsed: AgentStatus = serde_json::from_str("\"dark\"").unwrap();
        assert_eq!(parsed, AgentStatus::Dark);
    }

    #[test]
    fn record_without_loyalty_is_rejected() {
        let json = r#"{"codename": "GHOST", "location": "Karachi", "region": "south_asia"}"#;
        assert!(serde_json::from_str::<Agent>(json).is_err());
    }

    #[test]
    fn sparse_record_fills_collections() {
        let json = r#"{"codename": "GHOST", "loyalty": 140, "location": "Karachi",
                       "region": "south_asia", "known_compromises": ["SABLE", "SABLE"]}"#;
        let mut agent: Agent = serde_json::from_str(json).unwrap();
        agent.repair();
        assert_eq!(agent.loyalty, 100);
        assert_eq!(agent.current_status, AgentStatus::Active);
        assert_eq!(agent.known_compromises, vec!["SABLE".to_string()]);
        assert!(agent.missions.is_empty());
    }

    #[test]
    fn public_view_clamps_signal() {
        let json = r#"{"codename": "LOTUS", "loyalty": 95, "location": "Shanghai",
                       "region": "east_asia"}"#;
        let agent: Agent = serde_json::from_str(json).unwrap();
        assert_eq!(agent.public_view(10).signal_quality, 100);
        assert_eq!(agent.public_view(-10).signal_quality, 85);
    }
}
