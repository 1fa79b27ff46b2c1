//! Dialogue providers.
//!
//! A provider implements the conversation state machine for one family of
//! conversation models. Providers hold no conversation state of their own:
//! the manager hands them the current [`ConversationState`] and stores the
//! state they return in the response.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use taleweave_domain::{
    ConversationState, DialogueAction, DialogueChoice, DialogueEvent, DialogueEventKind,
    DialogueResponse, NpcId, PlayerId, ProviderKind, ResponseChoice, VariableContext,
};

use super::actions::ActionExecutor;
use super::conditions::ConditionEvaluator;
use super::context::{ContextBuilder, TurnContext};
use super::error::DialogueError;
use super::variables::VariableResolver;
use crate::infrastructure::ports::{ClockPort, DialogueEventSink};

#[async_trait]
pub trait DialogueProvider: Send + Sync {
    /// Registry key, unique per manager.
    fn id(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn can_handle(&self, npc_id: &NpcId) -> bool;

    /// Open a conversation and return its first response.
    async fn start(
        &self,
        player_id: &PlayerId,
        npc_id: &NpcId,
    ) -> Result<DialogueResponse, DialogueError>;

    /// Advance a conversation with the player's input.
    async fn continue_conversation(
        &self,
        state: ConversationState,
        input: &str,
    ) -> Result<DialogueResponse, DialogueError>;

    /// Close a conversation. Called for every exit except natural completion.
    async fn end(&self, state: ConversationState, reason: &str) -> Result<(), DialogueError>;
}

/// Behaviour shared by tree-driven providers: context building, rule
/// evaluation, action execution, text resolution and event emission.
pub struct DialogueRuntime {
    contexts: ContextBuilder,
    evaluator: ConditionEvaluator,
    executor: ActionExecutor,
    resolver: VariableResolver,
    events: Arc<dyn DialogueEventSink>,
    clock: Arc<dyn ClockPort>,
}

impl DialogueRuntime {
    pub fn new(
        contexts: ContextBuilder,
        evaluator: ConditionEvaluator,
        executor: ActionExecutor,
        resolver: VariableResolver,
        events: Arc<dyn DialogueEventSink>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            contexts,
            evaluator,
            executor,
            resolver,
            events,
            clock,
        }
    }

    pub fn clock(&self) -> &dyn ClockPort {
        self.clock.as_ref()
    }

    pub async fn context(&self, state: &ConversationState) -> Result<TurnContext, DialogueError> {
        self.contexts.build(state).await
    }

    pub async fn write_back(&self, state: &mut ConversationState, turn: &TurnContext) {
        self.contexts.write_back(state, turn).await;
    }

    pub fn resolve(&self, text: &str, context: &VariableContext) -> String {
        self.resolver.resolve(text, context)
    }

    /// Run actions in order, each gated by its own condition. Returns the
    /// ones that ran.
    pub async fn run_actions(
        &self,
        actions: &[DialogueAction],
        context: &mut VariableContext,
    ) -> Vec<DialogueAction> {
        let mut executed = Vec::new();
        for action in actions {
            if let Some(condition) = &action.condition {
                if !self.evaluator.evaluate(condition, context) {
                    continue;
                }
            }
            self.executor.execute(action, context).await;
            executed.push(action.clone());
        }
        executed
    }

    pub fn is_eligible(&self, choice: &DialogueChoice, context: &VariableContext) -> bool {
        match &choice.condition {
            Some(condition) => self.evaluator.evaluate(condition, context),
            None => true,
        }
    }

    /// Choices whose conditions pass, with their text resolved.
    pub fn visible_choices(
        &self,
        choices: &[DialogueChoice],
        context: &VariableContext,
    ) -> Vec<ResponseChoice> {
        choices
            .iter()
            .filter(|choice| self.is_eligible(choice, context))
            .map(|choice| self.present(choice, context))
            .collect()
    }

    fn present(&self, choice: &DialogueChoice, context: &VariableContext) -> ResponseChoice {
        ResponseChoice {
            id: choice.id.clone(),
            text: self.resolve(&choice.text, context),
        }
    }

    pub fn emit(&self, kind: DialogueEventKind, state: &ConversationState, payload: Value) {
        self.events.emit(DialogueEvent::new(
            kind,
            state.conversation_id.clone(),
            state.player_id().clone(),
            payload,
            self.clock.now(),
        ));
    }
}
