//! Decision handling - hidden block parsing and effect application.

mod engine;
mod parser;

pub use engine::{DecisionChanges, DecisionEngine, EventResponse, Extraction};
pub use parser::{
    has_hidden_block, parse_hidden_block, strip_hidden_block, DecisionKind, HiddenDecision,
    BLOCK_END, BLOCK_START,
};
