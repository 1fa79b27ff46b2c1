//! NPC to dialogue tree bindings.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use taleweave_domain::{DomainError, NpcId, TreeId};

use super::dialogue_trees::DialogueTreeStore;

/// Which tree each NPC speaks from.
///
/// An NPC can be handled by the scripted provider exactly when it has a
/// binding here.
pub struct NpcBindingRegistry {
    trees: Arc<DialogueTreeStore>,
    bindings: DashMap<NpcId, TreeId>,
}

impl NpcBindingRegistry {
    pub fn new(trees: Arc<DialogueTreeStore>) -> Self {
        Self {
            trees,
            bindings: DashMap::new(),
        }
    }

    /// Bind an NPC to a tree. Fails if the store does not know the tree.
    pub fn bind(&self, npc_id: NpcId, tree_id: TreeId) -> Result<(), DomainError> {
        if !self.trees.contains(&tree_id) {
            return Err(DomainError::not_found("dialogue tree", tree_id.as_str()));
        }
        tracing::debug!(npc_id = %npc_id, tree_id = %tree_id, "NPC bound to dialogue tree");
        self.bindings.insert(npc_id, tree_id);
        Ok(())
    }

    /// Bind every pair in `bindings`, logging and skipping the ones that fail.
    /// Returns the number bound.
    pub fn bind_all(&self, bindings: &HashMap<String, String>) -> usize {
        let mut bound = 0;
        for (npc, tree) in bindings {
            match self.bind(NpcId::new(npc.as_str()), TreeId::new(tree.as_str())) {
                Ok(()) => bound += 1,
                Err(e) => tracing::warn!(npc_id = %npc, tree_id = %tree, error = %e, "Skipping NPC binding"),
            }
        }
        bound
    }

    pub fn unbind(&self, npc_id: &NpcId) -> Option<TreeId> {
        self.bindings.remove(npc_id).map(|(_, tree)| tree)
    }

    pub fn can_handle(&self, npc_id: &NpcId) -> bool {
        self.bindings.contains_key(npc_id)
    }

    pub fn tree_for(&self, npc_id: &NpcId) -> Option<TreeId> {
        self.bindings.get(npc_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
