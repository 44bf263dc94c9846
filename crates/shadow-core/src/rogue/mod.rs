//! Autonomous events - complications that fire between turns.

mod engine;
mod narration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AgentStatus;

pub use engine::RogueEngine;
pub use narration::{fallback_narration, narrate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RogueEventKind {
    DefectionWarning,
    SilentDefection,
    DoubleAgentActivation,
    UnsanctionedAction,
    ExternalContact,
    CompromiseWarning,
}

impl RogueEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefectionWarning => "defection_warning",
            Self::SilentDefection => "silent_defection",
            Self::DoubleAgentActivation => "double_agent_activation",
            Self::UnsanctionedAction => "unsanctioned_action",
            Self::ExternalContact => "external_contact",
            Self::CompromiseWarning => "compromise_warning",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::SilentDefection | Self::UnsanctionedAction => Severity::Critical,
            _ => Severity::Warning,
        }
    }

    /// Alert title. The double agent's title does not name the operative.
    pub fn title(&self, codename: &str) -> String {
        match self {
            Self::DefectionWarning => format!("{codename} — DEFECTION WARNING"),
            Self::SilentDefection => format!("{codename} — GONE DARK"),
            Self::DoubleAgentActivation => "INTELLIGENCE ANOMALY DETECTED".to_string(),
            Self::UnsanctionedAction => format!("{codename} — UNSANCTIONED ACTION"),
            Self::ExternalContact => format!("{codename} — FOREIGN CONTACT DETECTED"),
            Self::CompromiseWarning => format!("{codename} — OPERATIVE WARNING"),
        }
    }
}

impl std::fmt::Display for RogueEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// What an event did. Fields not touched by an event stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RogueEffects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_change: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_change: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension_change: Option<i32>,
    /// Applied to every other active operative
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_loyalty_change: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub compromised: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warned_about: Option<String>,
}

/// A triggered autonomous event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RogueEvent {
    #[serde(rename = "type")]
    pub kind: RogueEventKind,
    pub codename: String,
    pub turn: u32,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub narration: String,
    pub severity: Severity,
    #[serde(default)]
    pub effects: RogueEffects,
    /// The full truth is kept from the director.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}
