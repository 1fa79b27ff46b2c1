//! Default game effects adapter.

use async_trait::async_trait;
use taleweave_domain::PlayerId;

use crate::infrastructure::ports::{GameEffectsPort, PortError};

/// Logs inventory and quest effects without applying them.
///
/// Stands in until the inventory and quest subsystems provide real ports.
#[derive(Debug, Default)]
pub struct LoggingGameEffects;

impl LoggingGameEffects {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GameEffectsPort for LoggingGameEffects {
    async fn give_item(&self, player_id: &PlayerId, item_id: &str, quantity: u32) -> Result<(), PortError> {
        tracing::info!(player_id = %player_id, item_id, quantity, "give_item requested (no inventory port)");
        Ok(())
    }

    async fn take_item(&self, player_id: &PlayerId, item_id: &str, quantity: u32) -> Result<(), PortError> {
        tracing::info!(player_id = %player_id, item_id, quantity, "take_item requested (no inventory port)");
        Ok(())
    }

    async fn start_quest(&self, player_id: &PlayerId, quest_id: &str) -> Result<(), PortError> {
        tracing::info!(player_id = %player_id, quest_id, "start_quest requested (no quest port)");
        Ok(())
    }

    async fn complete_quest(&self, player_id: &PlayerId, quest_id: &str) -> Result<(), PortError> {
        tracing::info!(player_id = %player_id, quest_id, "complete_quest requested (no quest port)");
        Ok(())
    }
}
