//! TaleWeave domain types.
//!
//! Pure data and invariants for the NPC conversation engine: dialogue trees,
//! conditions and actions, conversation state, and the per-turn variable
//! context. No I/O and no async; the engine crate owns both.

pub mod dialogue;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;

// Re-export dialogue model types
pub use dialogue::{
    ActionType, ComparisonOperator, ConditionType, ConversationContext, ConversationState,
    DialogueAction, DialogueChoice, DialogueCondition, DialogueNode, DialogueResponse,
    DialogueTree, NpcContext, ProviderKind, ResponseChoice, TreeMetadata, VariableContext,
};

pub use entities::{NpcInfo, PlayerState, QuestProgress, QuestStatus, WorldState};

pub use error::DomainError;
pub use events::{DialogueEvent, DialogueEventKind};

// Re-export ID types
pub use ids::{ConversationId, NpcId, PlayerId, RoomId, SessionId, TreeId};
