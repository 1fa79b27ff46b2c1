//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in a database:
//! - `DialogueTreeStore` - Validated dialogue trees loaded from content
//! - `NpcBindingRegistry` - Which tree each NPC speaks from
//! - `ConversationTable` - The single authoritative table of active conversations

pub mod conversations;
pub mod dialogue_trees;
pub mod npc_bindings;

// Re-export store types
pub use conversations::{ConversationEntry, ConversationHandle, ConversationTable};
pub use dialogue_trees::{DialogueTreeStore, LoadReport, SkippedFile};
pub use npc_bindings::NpcBindingRegistry;
