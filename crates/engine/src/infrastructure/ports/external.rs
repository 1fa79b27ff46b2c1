//! Collaborator port traits.
//!
//! The dialogue engine consumes these; the surrounding game implements them.

use async_trait::async_trait;
use taleweave_domain::{
    DialogueAction, DialogueEvent, NpcId, NpcInfo, PlayerId, PlayerState, RoomId, SessionId,
    VariableContext, WorldState,
};

use super::error::PortError;
use super::types::ConversationSnapshot;

// =============================================================================
// Game State
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerStatePort: Send + Sync {
    /// Current state of a player.
    async fn load(&self, player_id: &PlayerId) -> Result<PlayerState, PortError>;

    /// Set a flag. Setting a flag the player already has is a no-op.
    async fn add_flag(&self, player_id: &PlayerId, flag: &str) -> Result<(), PortError>;

    /// Clear a flag. Clearing an absent flag is a no-op.
    async fn remove_flag(&self, player_id: &PlayerId, flag: &str) -> Result<(), PortError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldPort: Send + Sync {
    async fn npc(&self, npc_id: &NpcId) -> Result<Option<NpcInfo>, PortError>;

    /// NPCs currently placed in a room, in placement order.
    async fn npcs_in_room(&self, room_id: &RoomId) -> Result<Vec<NpcInfo>, PortError>;

    async fn world_state(&self) -> Result<WorldState, PortError>;
}

/// Inventory and quest mutation requested by dialogue actions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameEffectsPort: Send + Sync {
    async fn give_item(&self, player_id: &PlayerId, item_id: &str, quantity: u32) -> Result<(), PortError>;
    async fn take_item(&self, player_id: &PlayerId, item_id: &str, quantity: u32) -> Result<(), PortError>;
    async fn start_quest(&self, player_id: &PlayerId, quest_id: &str) -> Result<(), PortError>;
    async fn complete_quest(&self, player_id: &PlayerId, quest_id: &str) -> Result<(), PortError>;
}

/// Game-specific handling for `custom` dialogue actions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomActionHandler: Send + Sync {
    async fn handle(
        &self,
        action: &DialogueAction,
        context: &mut VariableContext,
    ) -> Result<(), PortError>;
}

// =============================================================================
// Observability & Persistence
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait DialogueEventSink: Send + Sync {
    fn emit(&self, event: DialogueEvent);
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotPort: Send + Sync {
    async fn save(&self, snapshot: &ConversationSnapshot) -> Result<(), PortError>;
    async fn load(&self) -> Result<Option<ConversationSnapshot>, PortError>;
}

// =============================================================================
// Sessions
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionPort: Send + Sync {
    /// The player bound to a transport session, if any.
    async fn player_for_session(&self, session_id: &SessionId) -> Option<PlayerId>;
}
