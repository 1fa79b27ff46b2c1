//! Dialogue use cases.
//!
//! A player turn flows through:
//! 1. [`DialogueManager`] checks ownership, capacity and the idle timeout
//! 2. The conversation's [`DialogueProvider`] builds a [`TurnContext`]
//! 3. Conditions gate choices and actions; actions mutate the context
//! 4. The provider writes changes back and returns a new state
//! 5. The manager stores the state, or drops it if the conversation ended

mod actions;
mod conditions;
mod context;
mod error;
mod manager;
mod provider;
mod scripted;
mod variables;

pub use actions::ActionExecutor;
pub use conditions::{ConditionEvaluator, RuleError};
pub use context::{ContextBuilder, TurnContext};
pub use error::DialogueError;
pub use manager::{DialogueManager, DialogueManagerConfig, DialogueStatistics, ProviderSummary};
pub use provider::{DialogueProvider, DialogueRuntime};
pub use scripted::{matches_choice, ScriptedTreeProvider, DID_NOT_UNDERSTAND, NOTHING_TO_SAY};
pub use variables::VariableResolver;
