//! Scripted dialogue tree provider.
//!
//! Drives a conversation through an authored [`DialogueTree`]:
//!
//! ```text
//! STARTED -> AWAITING_INPUT (loop) -> ENDED
//! ```
//!
//! Each turn is a pure step from the state it is given to the state it
//! returns; the tree itself is never mutated.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use taleweave_domain::{
    ConversationId, ConversationState, DialogueAction, DialogueChoice, DialogueEventKind,
    DialogueNode, DialogueResponse, DialogueTree, NpcId, PlayerId, ProviderKind, ResponseChoice,
};

use super::context::TurnContext;
use super::error::DialogueError;
use super::provider::{DialogueProvider, DialogueRuntime};
use crate::stores::{DialogueTreeStore, NpcBindingRegistry};

/// Appended to the current node's message when no choice matches the input.
pub const DID_NOT_UNDERSTAND: &str = "(I didn't understand that. Please pick one of the options.)";

/// Appended instead when the node offers the player nothing they may pick.
pub const NOTHING_TO_SAY: &str = "(There is nothing you can say here right now.)";

pub struct ScriptedTreeProvider {
    id: String,
    bindings: Arc<NpcBindingRegistry>,
    trees: Arc<DialogueTreeStore>,
    runtime: Arc<DialogueRuntime>,
}

impl ScriptedTreeProvider {
    pub fn new(
        id: impl Into<String>,
        bindings: Arc<NpcBindingRegistry>,
        trees: Arc<DialogueTreeStore>,
        runtime: Arc<DialogueRuntime>,
    ) -> Self {
        Self {
            id: id.into(),
            bindings,
            trees,
            runtime,
        }
    }

    fn tree_of(&self, state: &ConversationState) -> Result<Arc<DialogueTree>, DialogueError> {
        let tree_id = state.tree_id.as_ref().ok_or_else(|| {
            DialogueError::configuration(format!(
                "Conversation {} has no dialogue tree",
                state.conversation_id
            ))
        })?;
        self.trees
            .get(tree_id)
            .ok_or_else(|| DialogueError::not_found("dialogue tree", tree_id))
    }

    async fn respond(
        &self,
        mut state: ConversationState,
        turn: TurnContext,
        message: String,
        choices: Vec<ResponseChoice>,
        actions: Vec<DialogueAction>,
        is_complete: bool,
    ) -> DialogueResponse {
        self.runtime.write_back(&mut state, &turn).await;
        DialogueResponse {
            conversation_id: state.conversation_id.clone(),
            message,
            choices: (!choices.is_empty()).then_some(choices),
            is_complete,
            variables: state.variables.clone(),
            actions,
            state,
        }
    }

    /// Enter `node`: merge its variables, run its entry actions, render it.
    async fn enter(
        &self,
        mut state: ConversationState,
        mut turn: TurnContext,
        node: &DialogueNode,
        mut actions: Vec<DialogueAction>,
    ) -> DialogueResponse {
        state.current_node_id = node.id.clone();
        turn.vars
            .conversation
            .variables
            .extend(node.variables.clone());
        actions.extend(self.runtime.run_actions(&node.actions, &mut turn.vars).await);

        self.runtime
            .emit(DialogueEventKind::NodeReached, &state, json!({ "nodeId": node.id }));
        tracing::debug!(conversation_id = %state.conversation_id, node_id = %node.id, "Dialogue node reached");

        let message = self.runtime.resolve(&node.npc_message, &turn.vars);
        let choices = self.runtime.visible_choices(&node.choices, &turn.vars);
        self.respond(state, turn, message, choices, actions, false).await
    }
}

/// First-match rule: the same integer as the choice id, or any input word
/// longer than two characters found in the choice text.
pub fn matches_choice(choice: &DialogueChoice, input: &str) -> bool {
    let input = input.trim();
    if let (Ok(id), Ok(picked)) = (choice.id.trim().parse::<i64>(), input.parse::<i64>()) {
        if id == picked {
            return true;
        }
    }

    let text = choice.text.to_lowercase();
    input
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .any(|word| text.contains(&word.to_lowercase()))
}

#[async_trait]
impl DialogueProvider for ScriptedTreeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Canned
    }

    fn can_handle(&self, npc_id: &NpcId) -> bool {
        self.bindings.can_handle(npc_id)
    }

    async fn start(
        &self,
        player_id: &PlayerId,
        npc_id: &NpcId,
    ) -> Result<DialogueResponse, DialogueError> {
        let tree_id = self
            .bindings
            .tree_for(npc_id)
            .ok_or_else(|| DialogueError::not_found("dialogue binding", npc_id))?;
        let tree = self
            .trees
            .get(&tree_id)
            .ok_or_else(|| DialogueError::not_found("dialogue tree", &tree_id))?;
        let node = tree.start_node().ok_or_else(|| {
            DialogueError::configuration(format!(
                "Dialogue tree {} has no start node {}",
                tree.id, tree.start_node_id
            ))
        })?;

        let now = self.runtime.clock().now();
        let mut state = ConversationState::new(
            ConversationId::generate(&self.id, player_id, npc_id, now),
            player_id.clone(),
            npc_id.clone(),
            self.id.clone(),
            now,
        );
        state.tree_id = Some(tree.id.clone());
        state.variables = tree.variables.clone();

        let turn = self.runtime.context(&state).await?;
        self.runtime.emit(
            DialogueEventKind::ConversationStarted,
            &state,
            json!({ "npcId": npc_id, "treeId": tree.id, "providerId": self.id }),
        );
        tracing::info!(
            conversation_id = %state.conversation_id,
            player_id = %player_id,
            npc_id = %npc_id,
            tree_id = %tree.id,
            "Conversation started"
        );

        Ok(self.enter(state, turn, node, Vec::new()).await)
    }

    async fn continue_conversation(
        &self,
        mut state: ConversationState,
        input: &str,
    ) -> Result<DialogueResponse, DialogueError> {
        if !state.is_active {
            return Err(DialogueError::not_found(
                "conversation",
                &state.conversation_id,
            ));
        }
        let tree = self.tree_of(&state)?;
        let node = tree.node(&state.current_node_id).ok_or_else(|| {
            DialogueError::configuration(format!(
                "Dialogue tree {} has no node {}",
                tree.id, state.current_node_id
            ))
        })?;

        state.touch(self.runtime.clock().now());
        let mut turn = self.runtime.context(&state).await?;
        let mut actions = Vec::new();

        let next_node_id = if node.choices.is_empty() {
            node.next_node_id.clone()
        } else {
            let picked = node
                .choices
                .iter()
                .filter(|choice| self.runtime.is_eligible(choice, &turn.vars))
                .find(|choice| matches_choice(choice, input));

            let Some(choice) = picked else {
                tracing::debug!(conversation_id = %state.conversation_id, input, "No choice matched");
                // Only choices the player could actually pick are offered again.
                let choices = self.runtime.visible_choices(&node.choices, &turn.vars);
                let note = if choices.is_empty() {
                    NOTHING_TO_SAY
                } else {
                    DID_NOT_UNDERSTAND
                };
                let message = format!(
                    "{}\n\n{}",
                    self.runtime.resolve(&node.npc_message, &turn.vars),
                    note
                );
                self.runtime.emit(
                    DialogueEventKind::ConversationContinued,
                    &state,
                    json!({ "nodeId": node.id, "matched": false }),
                );
                return Ok(self.respond(state, turn, message, choices, actions, false).await);
            };

            self.runtime.emit(
                DialogueEventKind::ChoiceMade,
                &state,
                json!({ "nodeId": node.id, "choiceId": choice.id, "input": input }),
            );
            actions = self.runtime.run_actions(&choice.actions, &mut turn.vars).await;
            choice
                .next_node_id
                .clone()
                .or_else(|| node.next_node_id.clone())
        };

        let next = match next_node_id {
            Some(next_id) if !node.is_end => Some(tree.node(&next_id).ok_or_else(|| {
                DialogueError::configuration(format!(
                    "Dialogue tree {} has no node {}",
                    tree.id, next_id
                ))
            })?),
            _ => None,
        };

        let Some(next) = next else {
            state.close();
            self.runtime.emit(
                DialogueEventKind::ConversationEnded,
                &state,
                json!({ "nodeId": node.id, "reason": "completed" }),
            );
            tracing::info!(conversation_id = %state.conversation_id, node_id = %node.id, "Conversation completed");
            let message = self.runtime.resolve(&node.npc_message, &turn.vars);
            return Ok(self
                .respond(state, turn, message, Vec::new(), actions, true)
                .await);
        };

        let response = self.enter(state, turn, next, actions).await;
        self.runtime.emit(
            DialogueEventKind::ConversationContinued,
            &response.state,
            json!({ "fromNodeId": node.id, "nodeId": next.id }),
        );
        Ok(response)
    }

    async fn end(&self, mut state: ConversationState, reason: &str) -> Result<(), DialogueError> {
        state.close();
        self.runtime.emit(
            DialogueEventKind::ConversationEnded,
            &state,
            json!({ "nodeId": state.current_node_id, "reason": reason }),
        );
        tracing::info!(conversation_id = %state.conversation_id, reason, "Conversation ended");
        Ok(())
    }
}
