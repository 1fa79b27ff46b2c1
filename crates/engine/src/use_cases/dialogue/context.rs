//! Per-turn variable context.
//!
//! The context is rebuilt from live player and world state on every turn and
//! never persisted. The player's flag list inside it is the one actions
//! mutate; [`ContextBuilder::write_back`] hands the changes back to the
//! conversation and, flag by flag, to the player store. Only flags the turn
//! itself added or removed are written, so turns of the same player in
//! different conversations do not overwrite each other's flags.

use std::sync::Arc;

use taleweave_domain::{
    ConversationContext, ConversationState, NpcContext, NpcInfo, VariableContext, WorldState,
};

use super::error::DialogueError;
use crate::infrastructure::ports::{ClockPort, PlayerStatePort, WorldPort};

/// A built context plus what is needed to detect changes at the end of the turn.
pub struct TurnContext {
    pub vars: VariableContext,
    loaded_flags: Vec<String>,
}

pub struct ContextBuilder {
    players: Arc<dyn PlayerStatePort>,
    world: Arc<dyn WorldPort>,
    clock: Arc<dyn ClockPort>,
}

impl ContextBuilder {
    pub fn new(
        players: Arc<dyn PlayerStatePort>,
        world: Arc<dyn WorldPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            players,
            world,
            clock,
        }
    }

    /// Build the context for a conversation's next turn.
    ///
    /// The player must load. NPC and world lookups fall back to minimal
    /// records since they only feed templates and conditions.
    pub async fn build(&self, state: &ConversationState) -> Result<TurnContext, DialogueError> {
        let player = self.players.load(state.player_id()).await?;

        let npc = match self.world.npc(&state.npc_id).await {
            Ok(Some(npc)) => npc,
            Ok(None) => {
                tracing::debug!(npc_id = %state.npc_id, "NPC unknown to the world, using a bare record");
                NpcInfo::new(state.npc_id.clone(), state.npc_id.as_str())
            }
            Err(e) => {
                tracing::warn!(npc_id = %state.npc_id, error = %e, "NPC lookup failed, using a bare record");
                NpcInfo::new(state.npc_id.clone(), state.npc_id.as_str())
            }
        };

        let world = self.world.world_state().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "World state unavailable, using the clock only");
            WorldState::at(self.clock.now())
        });

        let loaded_flags = player.flags.clone();
        Ok(TurnContext {
            vars: VariableContext::new(
                player,
                NpcContext::from(npc),
                ConversationContext::from(state),
                world,
            ),
            loaded_flags,
        })
    }

    /// Copy the turn's variable changes into `state` and persist flag changes.
    ///
    /// A failed flag write is logged; the turn itself already happened.
    pub async fn write_back(&self, state: &mut ConversationState, turn: &TurnContext) {
        state.variables = turn.vars.conversation.variables.clone();

        let flags = &turn.vars.player.flags;
        let player_id = state.player_id();

        for flag in flags.iter().filter(|f| !turn.loaded_flags.contains(f)) {
            if let Err(e) = self.players.add_flag(player_id, flag).await {
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    player_id = %player_id,
                    flag = %flag,
                    error = %e,
                    "Failed to set player flag"
                );
            }
        }
        for flag in turn.loaded_flags.iter().filter(|f| !flags.contains(f)) {
            if let Err(e) = self.players.remove_flag(player_id, flag).await {
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    player_id = %player_id,
                    flag = %flag,
                    error = %e,
                    "Failed to clear player flag"
                );
            }
        }
    }
}
