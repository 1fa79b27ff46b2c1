//! The authoritative conversation table.
//!
//! One entry per active conversation, shared across every session and
//! provider. Each entry's state sits behind its own async mutex so that a
//! turn's read-modify-write happens under a single writer, while the
//! immutable routing keys (player, provider, NPC) stay readable without it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use taleweave_domain::{ConversationId, ConversationState, NpcId, PlayerId};
use tokio::sync::Mutex;

/// Shared handle to one conversation's state.
pub type ConversationHandle = Arc<Mutex<ConversationState>>;

/// A table entry.
#[derive(Clone)]
pub struct ConversationEntry {
    pub conversation_id: ConversationId,
    pub player_id: PlayerId,
    pub npc_id: NpcId,
    pub provider_id: String,
    /// Insertion order, used to pick a player's first conversation.
    pub sequence: u64,
    pub state: ConversationHandle,
}

#[derive(Default)]
pub struct ConversationTable {
    entries: DashMap<ConversationId, ConversationEntry>,
    next_sequence: AtomicU64,
}

impl ConversationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a conversation, replacing any entry with the same id.
    pub fn insert(&self, state: ConversationState) -> ConversationEntry {
        let entry = ConversationEntry {
            conversation_id: state.conversation_id.clone(),
            player_id: state.player_id().clone(),
            npc_id: state.npc_id.clone(),
            provider_id: state.provider_id.clone(),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            state: Arc::new(Mutex::new(state)),
        };
        self.entries
            .insert(entry.conversation_id.clone(), entry.clone());
        entry
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<ConversationEntry> {
        self.entries.get(conversation_id).map(|e| e.value().clone())
    }

    pub fn remove(&self, conversation_id: &ConversationId) -> Option<ConversationEntry> {
        self.entries.remove(conversation_id).map(|(_, entry)| entry)
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.entries.contains_key(conversation_id)
    }

    pub fn count_for_player(&self, player_id: &PlayerId) -> usize {
        self.entries
            .iter()
            .filter(|e| &e.value().player_id == player_id)
            .count()
    }

    /// A player's conversations, oldest first.
    pub fn entries_for_player(&self, player_id: &PlayerId) -> Vec<ConversationEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| &e.value().player_id == player_id)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.sequence);
        entries
    }

    pub fn entries_for_provider(&self, provider_id: &str) -> Vec<ConversationEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.value().provider_id == provider_id)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.sequence);
        entries
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<ConversationEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.sequence);
        entries
    }

    /// Copy of every state, oldest first. Waits for in-flight turns.
    pub async fn snapshot(&self) -> Vec<ConversationState> {
        let mut states = Vec::new();
        for entry in self.entries() {
            states.push(entry.state.lock().await.clone());
        }
        states
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
