//! Game entities the dialogue system reads from its collaborators.

mod npc;
mod player;
mod world;

pub use npc::NpcInfo;
pub use player::{PlayerState, QuestProgress, QuestStatus};
pub use world::WorldState;
