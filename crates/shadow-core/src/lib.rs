//! Shadow Network core - turn and state engine
//!
//! This crate runs a director-versus-operatives espionage game: orders are
//! routed to language-model operatives whose replies carry hidden decisions,
//! those decisions move loyalty, regional tension, exposure and trust, and an
//! autonomous pass between turns injects complications until the game ends.

pub mod adapters;
pub mod config;
pub mod decision;
pub mod error;
pub mod rng;
pub mod rogue;
pub mod state;
pub mod turn;
pub mod voice;

pub use adapters::{Generator, GenerationError, MistralClient};
pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use rng::RandomSource;
pub use state::{FileStore, MemoryStore, Storage};
pub use turn::{TurnManager, TurnResult};
pub use voice::{VoiceError, VoiceService};
