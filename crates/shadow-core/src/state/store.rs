//! Durable storage for the world record and operative records.
//!
//! Every record is a single JSON document that is read whole, mutated in
//! memory and written back whole. Loads validate and repair records so the
//! rest of the engine only ever sees in-range values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{GameError, GameResult};

use super::agent::Agent;
use super::world::WorldState;

const WORLD_KEY: &str = "world_state";

/// Key-value persistence for game records.
pub trait Storage: Send + Sync {
    fn load_state(&self) -> GameResult<WorldState>;
    fn save_state(&self, state: &WorldState) -> GameResult<()>;

    /// Fails with [`GameError::AgentNotFound`] for unknown codenames.
    fn load_agent(&self, codename: &str) -> GameResult<Agent>;
    fn save_agent(&self, agent: &Agent) -> GameResult<()>;

    /// Write both the live records and the initial snapshot.
    fn seed(&self, state: &WorldState, agents: &[Agent]) -> GameResult<()>;

    /// Restore live records from the initial snapshot.
    fn reset(&self) -> GameResult<()>;
}

/// JSON files under a data directory.
///
/// ```text
/// <root>/state/world_state.json        live world
/// <root>/state_initial/world_state.json
/// <root>/memory/<CODENAME>.json        live operatives
/// <root>/memory_initial/<CODENAME>.json
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a live world record exists.
    pub fn is_seeded(&self) -> bool {
        self.world_path().exists()
    }

    fn world_path(&self) -> PathBuf {
        self.root.join("state").join(format!("{WORLD_KEY}.json"))
    }

    fn initial_world_path(&self) -> PathBuf {
        self.root.join("state_initial").join(format!("{WORLD_KEY}.json"))
    }

    fn agent_path(&self, codename: &str) -> PathBuf {
        self.root.join("memory").join(format!("{codename}.json"))
    }

    fn initial_agent_path(&self, codename: &str) -> PathBuf {
        self.root.join("memory_initial").join(format!("{codename}.json"))
    }

    fn read(path: &Path) -> GameResult<String> {
        std::fs::read_to_string(path).map_err(|e| GameError::storage(path, e))
    }

    /// Write through a sibling temp file so readers never see half a record.
    fn write(path: &Path, contents: &str) -> GameResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GameError::storage(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| GameError::storage(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| GameError::storage(path, e))
    }

    fn copy(src: &Path, dst: &Path) -> GameResult<()> {
        let contents = Self::read(src)?;
        Self::write(dst, &contents)
    }
}

impl Storage for FileStore {
    fn load_state(&self) -> GameResult<WorldState> {
        let contents = Self::read(&self.world_path())?;
        let mut state: WorldState =
            serde_json::from_str(&contents).map_err(|e| GameError::corrupt(WORLD_KEY, e))?;
        state.repair();
        Ok(state)
    }

    fn save_state(&self, state: &WorldState) -> GameResult<()> {
        let json =
            serde_json::to_string_pretty(state).map_err(|e| GameError::corrupt(WORLD_KEY, e))?;
        Self::write(&self.world_path(), &json)?;
        tracing::debug!(turn = state.turn, "World state saved");
        Ok(())
    }

    fn load_agent(&self, codename: &str) -> GameResult<Agent> {
        if !is_record_key(codename) {
            return Err(GameError::AgentNotFound(codename.to_string()));
        }
        let path = self.agent_path(codename);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GameError::AgentNotFound(codename.to_string()))
            }
            Err(e) => return Err(GameError::storage(path, e)),
        };
        let mut agent: Agent =
            serde_json::from_str(&contents).map_err(|e| GameError::corrupt(codename, e))?;
        agent.repair();
        Ok(agent)
    }

    fn save_agent(&self, agent: &Agent) -> GameResult<()> {
        if !is_record_key(&agent.codename) {
            return Err(GameError::AgentNotFound(agent.codename.clone()));
        }
        let json = serde_json::to_string_pretty(agent)
            .map_err(|e| GameError::corrupt(&agent.codename, e))?;
        Self::write(&self.agent_path(&agent.codename), &json)?;
        tracing::debug!(codename = %agent.codename, loyalty = agent.loyalty, "Operative saved");
        Ok(())
    }

    fn seed(&self, state: &WorldState, agents: &[Agent]) -> GameResult<()> {
        let world =
            serde_json::to_string_pretty(state).map_err(|e| GameError::corrupt(WORLD_KEY, e))?;
        Self::write(&self.initial_world_path(), &world)?;
        Self::write(&self.world_path(), &world)?;

        for agent in agents {
            let json = serde_json::to_string_pretty(agent)
                .map_err(|e| GameError::corrupt(&agent.codename, e))?;
            Self::write(&self.initial_agent_path(&agent.codename), &json)?;
            Self::write(&self.agent_path(&agent.codename), &json)?;
        }

        tracing::info!(root = %self.root.display(), operatives = agents.len(), "Game data seeded");
        Ok(())
    }

    fn reset(&self) -> GameResult<()> {
        let initial_world = self.initial_world_path();
        if initial_world.exists() {
            Self::copy(&initial_world, &self.world_path())?;
            tracing::info!("Reset world state");
        }

        let initial_memory = self.root.join("memory_initial");
        if initial_memory.exists() {
            let entries = std::fs::read_dir(&initial_memory)
                .map_err(|e| GameError::storage(&initial_memory, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| GameError::storage(&initial_memory, e))?;
                let src = entry.path();
                if src.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                let Some(name) = src.file_name() else { continue };
                Self::copy(&src, &self.root.join("memory").join(name))?;
                tracing::info!(file = %src.display(), "Reset operative memory");
            }
        }

        tracing::info!("Game state fully reset to initial values");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    world: Option<WorldState>,
    agents: HashMap<String, Agent>,
}

/// Process-local storage, used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    live: Mutex<Snapshot>,
    initial: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given records.
    pub fn seeded(state: &WorldState, agents: &[Agent]) -> Self {
        let store = Self::new();
        // Seeding an in-memory store cannot fail.
        let _ = store.seed(state, agents);
        store
    }

    fn live(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn initial(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.initial.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStore {
    fn load_state(&self) -> GameResult<WorldState> {
        let mut state = self
            .live()
            .world
            .clone()
            .ok_or_else(|| GameError::corrupt(WORLD_KEY, "world state has not been seeded"))?;
        state.repair();
        Ok(state)
    }

    fn save_state(&self, state: &WorldState) -> GameResult<()> {
        self.live().world = Some(state.clone());
        Ok(())
    }

    fn load_agent(&self, codename: &str) -> GameResult<Agent> {
        let mut agent = self
            .live()
            .agents
            .get(codename)
            .cloned()
            .ok_or_else(|| GameError::AgentNotFound(codename.to_string()))?;
        agent.repair();
        Ok(agent)
    }

    fn save_agent(&self, agent: &Agent) -> GameResult<()> {
        self.live()
            .agents
            .insert(agent.codename.clone(), agent.clone());
        Ok(())
    }

    fn seed(&self, state: &WorldState, agents: &[Agent]) -> GameResult<()> {
        let agents: HashMap<String, Agent> = agents
            .iter()
            .map(|a| (a.codename.clone(), a.clone()))
            .collect();
        {
            let mut initial = self.initial();
            initial.world = Some(state.clone());
            initial.agents = agents.clone();
        }
        let mut live = self.live();
        live.world = Some(state.clone());
        live.agents = agents;
        Ok(())
    }

    fn reset(&self) -> GameResult<()> {
        let initial = self.initial();
        let mut live = self.live();
        live.world = initial.world.clone();
        live.agents = initial.agents.clone();
        Ok(())
    }
}

/// Codenames become file names, so only plain identifiers are accepted.
fn is_record_key(codename: &str) -> bool {
    !codename.is_empty()
        && codename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
