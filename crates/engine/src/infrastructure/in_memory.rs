//! In-memory collaborators.
//!
//! Back the console binary and tests. A real deployment replaces them with
//! adapters over the game's own player, world and session services.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use taleweave_domain::{NpcId, NpcInfo, PlayerId, PlayerState, RoomId, SessionId, WorldState};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{ClockPort, PlayerStatePort, PortError, SessionPort, WorldPort};

/// Player states keyed by player id.
#[derive(Default)]
pub struct InMemoryPlayers {
    players: RwLock<HashMap<PlayerId, PlayerState>>,
}

impl InMemoryPlayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, player: PlayerState) {
        self.players.write().await.insert(player.id.clone(), player);
    }

    pub async fn get(&self, player_id: &PlayerId) -> Option<PlayerState> {
        self.players.read().await.get(player_id).cloned()
    }
}

#[async_trait]
impl PlayerStatePort for InMemoryPlayers {
    async fn load(&self, player_id: &PlayerId) -> Result<PlayerState, PortError> {
        self.get(player_id)
            .await
            .ok_or_else(|| PortError::not_found("player", player_id))
    }

    async fn add_flag(&self, player_id: &PlayerId, flag: &str) -> Result<(), PortError> {
        let mut players = self.players.write().await;
        let player = players
            .get_mut(player_id)
            .ok_or_else(|| PortError::not_found("player", player_id))?;
        if !player.has_flag(flag) {
            player.flags.push(flag.to_string());
        }
        Ok(())
    }

    async fn remove_flag(&self, player_id: &PlayerId, flag: &str) -> Result<(), PortError> {
        let mut players = self.players.write().await;
        let player = players
            .get_mut(player_id)
            .ok_or_else(|| PortError::not_found("player", player_id))?;
        player.flags.retain(|f| f != flag);
        Ok(())
    }
}

/// NPC placement plus global flags.
pub struct InMemoryWorld {
    npcs: RwLock<Vec<NpcInfo>>,
    global_flags: RwLock<Vec<String>>,
    faction_relations: RwLock<HashMap<String, f64>>,
    clock: Arc<dyn ClockPort>,
}

impl InMemoryWorld {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            npcs: RwLock::new(Vec::new()),
            global_flags: RwLock::new(Vec::new()),
            faction_relations: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Place an NPC, replacing any previous entry with the same id.
    pub async fn place_npc(&self, npc: NpcInfo) {
        let mut npcs = self.npcs.write().await;
        match npcs.iter_mut().find(|n| n.id == npc.id) {
            Some(existing) => *existing = npc,
            None => npcs.push(npc),
        }
    }

    pub async fn set_global_flag(&self, flag: impl Into<String>) {
        let flag = flag.into();
        let mut flags = self.global_flags.write().await;
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    }

    pub async fn set_faction_relation(&self, faction: impl Into<String>, value: f64) {
        self.faction_relations.write().await.insert(faction.into(), value);
    }

    /// Load NPC placements from a YAML or JSON list of NPCs.
    pub async fn load_npcs(&self, path: &Path) -> Result<usize, PortError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PortError::storage("npcs.read", e))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let npcs: Vec<NpcInfo> = if is_json {
            serde_json::from_str(&content).map_err(PortError::serialization)?
        } else {
            serde_yaml::from_str(&content).map_err(PortError::serialization)?
        };

        let count = npcs.len();
        for npc in npcs {
            self.place_npc(npc).await;
        }
        Ok(count)
    }
}

#[async_trait]
impl WorldPort for InMemoryWorld {
    async fn npc(&self, npc_id: &NpcId) -> Result<Option<NpcInfo>, PortError> {
        Ok(self.npcs.read().await.iter().find(|n| &n.id == npc_id).cloned())
    }

    async fn npcs_in_room(&self, room_id: &RoomId) -> Result<Vec<NpcInfo>, PortError> {
        Ok(self
            .npcs
            .read()
            .await
            .iter()
            .filter(|n| n.room_id.as_ref() == Some(room_id))
            .cloned()
            .collect())
    }

    async fn world_state(&self) -> Result<WorldState, PortError> {
        let mut state = WorldState::at(self.clock.now());
        state.global_flags = self.global_flags.read().await.clone();
        state.faction_relations = self.faction_relations.read().await.clone();
        Ok(state)
    }
}

/// Session id to player id bindings.
#[derive(Default)]
pub struct InMemorySessions {
    sessions: RwLock<HashMap<SessionId, PlayerId>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bind(&self, session_id: SessionId, player_id: PlayerId) {
        self.sessions.write().await.insert(session_id, player_id);
    }

    pub async fn unbind(&self, session_id: &SessionId) {
        self.sessions.write().await.remove(session_id);
    }
}

#[async_trait]
impl SessionPort for InMemorySessions {
    async fn player_for_session(&self, session_id: &SessionId) -> Option<PlayerId> {
        self.sessions.read().await.get(session_id).cloned()
    }
}
