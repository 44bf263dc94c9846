//! State management - world record, operative records and their storage.

pub mod agent;
mod registry;
pub mod scenario;
mod store;
pub mod world;

pub use agent::{Agent, AgentStatus, MissionRecord, PublicAgent};
pub use registry::AgentRegistry;
pub use store::{FileStore, MemoryStore, Storage};
pub use world::{
    GameOver, GameOverKind, MissionLogEntry, PublicWorldState, Region, ThreatLevel, WorldEvent,
    WorldState,
};
