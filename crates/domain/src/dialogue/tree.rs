//! Dialogue tree definitions.
//!
//! A tree is the static, author-defined node/choice graph for one
//! conversation topic. Trees are loaded from content files and never mutated
//! after validation; replacing one means validating and swapping a new value.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::{DialogueAction, DialogueCondition};
use crate::error::DomainError;
use crate::ids::TreeId;

/// Authoring metadata carried by a tree file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeMetadata {
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// A complete dialogue tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueTree {
    pub id: TreeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    pub start_node_id: String,
    pub nodes: HashMap<String, DialogueNode>,
    /// Default conversation variables, seeded when a conversation starts.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub metadata: TreeMetadata,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// One NPC turn plus the player's available responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNode {
    pub id: String,
    /// Message template. Always present, may be empty.
    #[serde(default)]
    pub npc_message: String,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
    /// Entry actions, run every time the node is reached.
    #[serde(default)]
    pub actions: Vec<DialogueAction>,
    #[serde(default)]
    pub is_end: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    /// Merged into the conversation variables when the node is reached.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Declared by the content format but never consulted during traversal;
    /// only choice conditions and action conditions gate anything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<DialogueCondition>,
}

/// A selectable player response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueChoice {
    pub id: String,
    /// Choice text template.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<DialogueCondition>,
    #[serde(default)]
    pub actions: Vec<DialogueAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
}

impl DialogueTree {
    /// Look up a node by id.
    pub fn node(&self, node_id: &str) -> Option<&DialogueNode> {
        self.nodes.get(node_id)
    }

    /// The node every conversation on this tree starts at.
    pub fn start_node(&self) -> Option<&DialogueNode> {
        self.nodes.get(&self.start_node_id)
    }

    /// Check the structural invariants of a tree.
    ///
    /// - id, name, start node id and the node map are non-empty
    /// - the start node exists
    /// - every node's id equals its map key
    /// - every node and choice is well-formed, and transitions point at
    ///   nodes that exist
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::validation("Dialogue tree id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "Dialogue tree '{}' has an empty name",
                self.id
            )));
        }
        if self.start_node_id.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "Dialogue tree '{}' has an empty startNodeId",
                self.id
            )));
        }
        if self.nodes.is_empty() {
            return Err(DomainError::validation(format!(
                "Dialogue tree '{}' has no nodes",
                self.id
            )));
        }
        if !self.nodes.contains_key(&self.start_node_id) {
            return Err(DomainError::validation(format!(
                "Dialogue tree '{}' start node '{}' does not exist",
                self.id, self.start_node_id
            )));
        }

        for (key, node) in &self.nodes {
            self.validate_node(key, node)?;
        }

        Ok(())
    }

    fn validate_node(&self, key: &str, node: &DialogueNode) -> Result<(), DomainError> {
        if node.id != key {
            return Err(DomainError::validation(format!(
                "Dialogue tree '{}' node key '{}' does not match node id '{}'",
                self.id, key, node.id
            )));
        }
        if let Some(next) = &node.next_node_id {
            self.ensure_target(key, next)?;
        }

        let mut seen = Vec::with_capacity(node.choices.len());
        for choice in &node.choices {
            if choice.id.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "Dialogue tree '{}' node '{}' has a choice with an empty id",
                    self.id, key
                )));
            }
            if seen.contains(&choice.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "Dialogue tree '{}' node '{}' has duplicate choice id '{}'",
                    self.id, key, choice.id
                )));
            }
            seen.push(choice.id.as_str());

            if let Some(next) = &choice.next_node_id {
                self.ensure_target(key, next)?;
            }
        }

        Ok(())
    }

    fn ensure_target(&self, from: &str, target: &str) -> Result<(), DomainError> {
        if self.nodes.contains_key(target) {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "Dialogue tree '{}' node '{}' points at unknown node '{}'",
                self.id, from, target
            )))
        }
    }
}

impl DialogueNode {
    pub fn new(id: impl Into<String>, npc_message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            npc_message: npc_message.into(),
            choices: Vec::new(),
            actions: Vec::new(),
            is_end: false,
            next_node_id: None,
            variables: HashMap::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_choice(mut self, choice: DialogueChoice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_action(mut self, action: DialogueAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_next(mut self, next_node_id: impl Into<String>) -> Self {
        self.next_node_id = Some(next_node_id.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn ending(mut self) -> Self {
        self.is_end = true;
        self
    }
}

impl DialogueChoice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            condition: None,
            actions: Vec::new(),
            next_node_id: None,
        }
    }

    pub fn to(mut self, next_node_id: impl Into<String>) -> Self {
        self.next_node_id = Some(next_node_id.into());
        self
    }

    pub fn when(mut self, condition: DialogueCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_action(mut self, action: DialogueAction) -> Self {
        self.actions.push(action);
        self
    }
}
