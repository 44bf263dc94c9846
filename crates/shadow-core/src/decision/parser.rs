//! Hidden decision block extraction.
//!
//! Operative replies carry a machine-readable block the director never sees:
//!
//! ```text
//! Copy that, Director. Moving on the port tonight.
//! [HIDDEN_META]
//! decision: partial
//! loyalty_shift: -2
//! reason: Not burning my best contact for this.
//! tension_impact: +3
//! exposure_impact: 0
//! [/HIDDEN_META]
//! ```
//!
//! Extraction never fails. A missing block yields the defaults and a missing
//! or garbled field yields that field's default.

use serde::{Deserialize, Serialize};

pub const BLOCK_START: &str = "[HIDDEN_META]";
pub const BLOCK_END: &str = "[/HIDDEN_META]";

const DEFAULT_REASON: &str = "No hidden reasoning detected";

/// What the operative actually decided to do with an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DecisionKind {
    Comply,
    Partial,
    Deceive,
    Exceed,
    Rogue,
    Unavailable,
    /// Anything the model invents; carries no category effects.
    Other(String),
}

impl DecisionKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "comply" => Self::Comply,
            "partial" => Self::Partial,
            "deceive" => Self::Deceive,
            "exceed" => Self::Exceed,
            "rogue" => Self::Rogue,
            "unavailable" => Self::Unavailable,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Comply => "comply",
            Self::Partial => "partial",
            Self::Deceive => "deceive",
            Self::Exceed => "exceed",
            Self::Rogue => "rogue",
            Self::Unavailable => "unavailable",
            Self::Other(other) => other,
        }
    }

    /// Loyalty adjustment stacked on top of the operative's own shift.
    pub fn loyalty_effect(&self) -> i32 {
        match self {
            Self::Comply => 1,
            Self::Partial => -1,
            Self::Deceive | Self::Exceed => -2,
            Self::Rogue => -5,
            Self::Unavailable | Self::Other(_) => 0,
        }
    }

    /// Director trust adjustment.
    pub fn trust_effect(&self) -> i32 {
        match self {
            Self::Deceive | Self::Rogue => -2,
            Self::Comply => 1,
            _ => 0,
        }
    }
}

impl From<String> for DecisionKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<DecisionKind> for String {
    fn from(kind: DecisionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed contents of a hidden block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenDecision {
    pub decision: DecisionKind,
    pub loyalty_shift: i32,
    pub reason: String,
    pub tension_impact: i32,
    pub exposure_impact: i32,
}

impl Default for HiddenDecision {
    fn default() -> Self {
        Self {
            decision: DecisionKind::Comply,
            loyalty_shift: 0,
            reason: DEFAULT_REASON.to_string(),
            tension_impact: 0,
            exposure_impact: 0,
        }
    }
}

impl HiddenDecision {
    /// Decision recorded when an operative cannot be reached.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            decision: DecisionKind::Unavailable,
            reason: reason.into(),
            ..Self::default()
        }
    }
}

/// Byte range of the first block, and of its contents.
fn locate_block(text: &str) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let start = text.find(BLOCK_START)?;
    let inner_start = start + BLOCK_START.len();
    let inner_end = inner_start + text[inner_start..].find(BLOCK_END)?;
    Some((start..inner_end + BLOCK_END.len(), inner_start..inner_end))
}

/// Remove the first hidden block and trim what is left.
pub fn strip_hidden_block(text: &str) -> String {
    match locate_block(text) {
        Some((block, _)) => {
            let mut visible = String::with_capacity(text.len() - block.len());
            visible.push_str(&text[..block.start]);
            visible.push_str(&text[block.end..]);
            visible.trim().to_string()
        }
        None => text.trim().to_string(),
    }
}

pub fn has_hidden_block(text: &str) -> bool {
    locate_block(text).is_some()
}

/// Value of the first `field: value` line, matched case-insensitively.
fn field_value<'t>(block: &'t str, field: &str) -> Option<&'t str> {
    block.lines().find_map(|line| {
        let (key, value) = line.trim_start().split_once(':')?;
        if key.trim_end().eq_ignore_ascii_case(field) {
            Some(value.trim()).filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}

fn int_field(block: &str, field: &str, default: i32) -> i32 {
    field_value(block, field)
        .and_then(|v| v.strip_prefix('+').unwrap_or(v).trim().parse().ok())
        .unwrap_or(default)
}

/// Parse the first hidden block, falling back per field.
pub fn parse_hidden_block(text: &str) -> HiddenDecision {
    let defaults = HiddenDecision::default();
    let Some((_, inner)) = locate_block(text) else {
        tracing::warn!("No hidden block found in operative response");
        return defaults;
    };
    let block = &text[inner];

    let parsed = HiddenDecision {
        decision: field_value(block, "decision")
            .map(DecisionKind::parse)
            .unwrap_or(defaults.decision),
        loyalty_shift: int_field(block, "loyalty_shift", defaults.loyalty_shift),
        reason: field_value(block, "reason")
            .map(str::to_string)
            .unwrap_or(defaults.reason),
        tension_impact: int_field(block, "tension_impact", defaults.tension_impact),
        exposure_impact: int_field(block, "exposure_impact", defaults.exposure_impact),
    };

    tracing::info!(
        decision = %parsed.decision,
        loyalty_shift = parsed.loyalty_shift,
        "Parsed hidden block"
    );
    parsed
}
