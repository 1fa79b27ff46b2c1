//! Action execution.
//!
//! Actions are the effects attached to nodes and choices. Conversation
//! variables and player flags change in the turn's [`VariableContext`];
//! inventory and quest changes go to the [`GameEffectsPort`]. A failing
//! action is logged and skipped so one bad rule never aborts a turn.

use std::sync::Arc;

use serde_json::{json, Value};
use taleweave_domain::{
    ActionType, DialogueAction, DialogueEvent, DialogueEventKind, VariableContext,
};

use super::conditions::RuleError;
use crate::infrastructure::ports::{
    ClockPort, CustomActionHandler, DialogueEventSink, GameEffectsPort,
};

pub struct ActionExecutor {
    effects: Arc<dyn GameEffectsPort>,
    events: Arc<dyn DialogueEventSink>,
    clock: Arc<dyn ClockPort>,
    custom: Option<Arc<dyn CustomActionHandler>>,
}

impl ActionExecutor {
    pub fn new(
        effects: Arc<dyn GameEffectsPort>,
        events: Arc<dyn DialogueEventSink>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            effects,
            events,
            clock,
            custom: None,
        }
    }

    /// Route `custom` actions to a game-specific handler.
    pub fn with_custom_handler(mut self, handler: Arc<dyn CustomActionHandler>) -> Self {
        self.custom = Some(handler);
        self
    }

    /// Run one action. The action's own condition is not consulted here.
    pub async fn execute(&self, action: &DialogueAction, context: &mut VariableContext) {
        self.events.emit(DialogueEvent::new(
            DialogueEventKind::ActionExecuted,
            context.conversation.id.clone(),
            context.player.id.clone(),
            json!({
                "type": action.kind.as_str(),
                "target": action.target,
                "value": action.value,
            }),
            self.clock.now(),
        ));

        if let Err(e) = self.apply(action, context).await {
            tracing::warn!(
                conversation_id = %context.conversation.id,
                action = action.kind.as_str(),
                target = ?action.target,
                error = %e,
                "Dialogue action failed"
            );
        }
    }

    async fn apply(
        &self,
        action: &DialogueAction,
        context: &mut VariableContext,
    ) -> Result<(), RuleError> {
        let player_id = context.player.id.clone();

        match action.kind {
            ActionType::SetVariable => {
                let name = target(action)?;
                let value = action.value.clone().unwrap_or(Value::Null);
                context.conversation.variables.insert(name.to_string(), value);
            }
            ActionType::AddFlag => {
                let flag = target(action)?;
                if !context.player.has_flag(flag) {
                    context.player.flags.push(flag.to_string());
                }
            }
            ActionType::RemoveFlag => {
                let flag = target(action)?;
                context.player.flags.retain(|f| f != flag);
            }
            ActionType::GiveItem => {
                self.effects
                    .give_item(&player_id, target(action)?, quantity(action)?)
                    .await?;
            }
            ActionType::TakeItem => {
                self.effects
                    .take_item(&player_id, target(action)?, quantity(action)?)
                    .await?;
            }
            ActionType::StartQuest => {
                self.effects.start_quest(&player_id, target(action)?).await?;
            }
            ActionType::CompleteQuest => {
                self.effects
                    .complete_quest(&player_id, target(action)?)
                    .await?;
            }
            ActionType::Custom => match &self.custom {
                Some(handler) => handler.handle(action, context).await?,
                None => {
                    tracing::debug!(target = ?action.target, "No handler for custom dialogue action");
                }
            },
            ActionType::Unknown => return Err(RuleError::UnknownType),
        }

        Ok(())
    }
}

fn target(action: &DialogueAction) -> Result<&str, RuleError> {
    action
        .target
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(RuleError::Missing("action target"))
}

/// Item quantity from the action value; defaults to one.
fn quantity(action: &DialogueAction) -> Result<u32, RuleError> {
    match &action.value {
        None | Some(Value::Null) => Ok(1),
        Some(value) => value
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| RuleError::InvalidValue(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::effects::LoggingGameEffects;
    use crate::infrastructure::event_sink::RecordingEventSink;
    use crate::infrastructure::ports::{MockCustomActionHandler, MockGameEffectsPort, PortError};
    use crate::test_fixtures::{alice, context, context_for, epoch};
    use taleweave_domain::PlayerId;

    fn executor_with(effects: MockGameEffectsPort) -> (ActionExecutor, Arc<RecordingEventSink>) {
        let events = Arc::new(RecordingEventSink::new());
        let executor = ActionExecutor::new(
            Arc::new(effects),
            events.clone(),
            Arc::new(FixedClock(epoch())),
        );
        (executor, events)
    }

    fn executor() -> (ActionExecutor, Arc<RecordingEventSink>) {
        let events = Arc::new(RecordingEventSink::new());
        let executor = ActionExecutor::new(
            Arc::new(LoggingGameEffects::new()),
            events.clone(),
            Arc::new(FixedClock(epoch())),
        );
        (executor, events)
    }

    #[tokio::test]
    async fn set_variable_writes_conversation_variables() {
        let (executor, events) = executor();
        let mut ctx = context();

        executor
            .execute(&DialogueAction::set_variable("mood", "grumpy"), &mut ctx)
            .await;

        assert_eq!(ctx.variable("mood"), Some(&json!("grumpy")));
        assert_eq!(events.kinds(), vec![DialogueEventKind::ActionExecuted]);
    }

    #[tokio::test]
    async fn flags_change_in_place_and_idempotently() {
        let (executor, _) = executor();
        let mut ctx = context_for(alice().with_flag("met_king"));

        executor.execute(&DialogueAction::add_flag("met_king"), &mut ctx).await;
        executor.execute(&DialogueAction::add_flag("owes_smith"), &mut ctx).await;
        assert_eq!(ctx.player.flags, vec!["met_king", "owes_smith"]);

        executor.execute(&DialogueAction::remove_flag("met_king"), &mut ctx).await;
        executor.execute(&DialogueAction::remove_flag("never_set"), &mut ctx).await;
        assert_eq!(ctx.player.flags, vec!["owes_smith"]);
    }

    #[tokio::test]
    async fn item_and_quest_actions_go_to_game_effects() {
        let mut effects = MockGameEffectsPort::new();
        effects
            .expect_give_item()
            .withf(|player, item, quantity| {
                player == &PlayerId::new("alice") && item == "sword" && *quantity == 2
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        effects
            .expect_start_quest()
            .withf(|_, quest| quest == "dragon")
            .times(1)
            .returning(|_, _| Ok(()));
        let (executor, events) = executor_with(effects);
        let mut ctx = context();

        executor
            .execute(
                &DialogueAction::new(ActionType::GiveItem)
                    .with_target("sword")
                    .with_value(2),
                &mut ctx,
            )
            .await;
        executor
            .execute(
                &DialogueAction::new(ActionType::StartQuest).with_target("dragon"),
                &mut ctx,
            )
            .await;

        assert_eq!(events.events().len(), 2);
    }

    #[tokio::test]
    async fn failures_are_swallowed_and_still_emit_events() {
        let mut effects = MockGameEffectsPort::new();
        effects
            .expect_take_item()
            .returning(|_, _, _| Err(PortError::Unavailable("inventory offline".into())));
        let (executor, events) = executor_with(effects);
        let mut ctx = context();
        let before = ctx.clone();

        executor
            .execute(&DialogueAction::new(ActionType::TakeItem).with_target("coin"), &mut ctx)
            .await;
        executor.execute(&DialogueAction::new(ActionType::Unknown), &mut ctx).await;
        executor.execute(&DialogueAction::new(ActionType::AddFlag), &mut ctx).await;
        executor
            .execute(
                &DialogueAction::new(ActionType::GiveItem)
                    .with_target("coin")
                    .with_value("lots"),
                &mut ctx,
            )
            .await;

        assert_eq!(ctx, before);
        assert_eq!(events.events().len(), 4);
    }

    #[tokio::test]
    async fn custom_actions_reach_the_handler() {
        let mut handler = MockCustomActionHandler::new();
        handler
            .expect_handle()
            .times(1)
            .returning(|_, ctx| {
                ctx.player.flags.push("handled".to_string());
                Ok(())
            });
        let (executor, _) = executor();
        let executor = executor.with_custom_handler(Arc::new(handler));
        let mut ctx = context();

        executor
            .execute(&DialogueAction::new(ActionType::Custom).with_target("dance"), &mut ctx)
            .await;

        assert!(ctx.player.has_flag("handled"));
    }
}
