//! Dialogue model: trees, rules, conversation state and the variable context.

mod context;
mod conversation;
mod rules;
mod tree;

pub use context::{ConversationContext, NpcContext, VariableContext};
pub use conversation::{ConversationState, DialogueResponse, ProviderKind, ResponseChoice};
pub use rules::{ActionType, ComparisonOperator, ConditionType, DialogueAction, DialogueCondition};
pub use tree::{DialogueChoice, DialogueNode, DialogueTree, TreeMetadata};
