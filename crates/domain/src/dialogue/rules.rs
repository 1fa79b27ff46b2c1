//! Conditions and actions attached to dialogue nodes and choices.
//!
//! Both are plain data; evaluation and execution live in the engine. Type
//! and operator names are closed sets, with an `Unknown` catch-all so a tree
//! authored against a newer vocabulary still loads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Variable,
    Flag,
    Item,
    Quest,
    Stat,
    Skill,
    Level,
    Time,
    Random,
    #[serde(other)]
    Unknown,
}

/// How a condition compares its subject with its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    #[serde(alias = "greater_than_or_equal")]
    GreaterEqual,
    #[serde(alias = "less_than_or_equal")]
    LessEqual,
    Contains,
    Has,
    NotHas,
    #[serde(other)]
    Unknown,
}

/// A predicate over the variable context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueCondition {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    #[serde(default)]
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub negate: bool,
}

impl DialogueCondition {
    pub fn new(kind: ConditionType, operator: ComparisonOperator, target: impl Into<String>) -> Self {
        Self {
            kind,
            operator,
            target: target.into(),
            value: None,
            negate: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// What an action does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SetVariable,
    GiveItem,
    TakeItem,
    AddFlag,
    RemoveFlag,
    StartQuest,
    CompleteQuest,
    Custom,
    #[serde(other)]
    Unknown,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetVariable => "set_variable",
            Self::GiveItem => "give_item",
            Self::TakeItem => "take_item",
            Self::AddFlag => "add_flag",
            Self::RemoveFlag => "remove_flag",
            Self::StartQuest => "start_quest",
            Self::CompleteQuest => "complete_quest",
            Self::Custom => "custom",
            Self::Unknown => "unknown",
        }
    }
}

/// An effect, optionally gated by its own condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<DialogueCondition>,
}

impl DialogueAction {
    pub fn new(kind: ActionType) -> Self {
        Self {
            kind,
            target: None,
            value: None,
            condition: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn when(mut self, condition: DialogueCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn set_variable(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(ActionType::SetVariable)
            .with_target(name)
            .with_value(value)
    }

    pub fn add_flag(flag: impl Into<String>) -> Self {
        Self::new(ActionType::AddFlag).with_target(flag)
    }

    pub fn remove_flag(flag: impl Into<String>) -> Self {
        Self::new(ActionType::RemoveFlag).with_target(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_vocabulary_still_parses() {
        let json = r#"{"type":"telepathy","operator":"resonates","target":"x"}"#;
        let condition: DialogueCondition = serde_json::from_str(json).expect("parse");
        assert_eq!(condition.kind, ConditionType::Unknown);
        assert_eq!(condition.operator, ComparisonOperator::Unknown);

        let action: DialogueAction = serde_json::from_str(r#"{"type":"teleport"}"#).expect("parse");
        assert_eq!(action.kind, ActionType::Unknown);
    }

    #[test]
    fn operator_defaults_to_equals_and_accepts_long_aliases() {
        let condition: DialogueCondition =
            serde_json::from_str(r#"{"type":"random","value":0.25}"#).expect("parse");
        assert_eq!(condition.operator, ComparisonOperator::Equals);
        assert!(!condition.negate);

        let condition: DialogueCondition = serde_json::from_str(
            r#"{"type":"level","operator":"greater_than_or_equal","target":"","value":5}"#,
        )
        .expect("parse");
        assert_eq!(condition.operator, ComparisonOperator::GreaterEqual);
    }

    #[test]
    fn gated_action_round_trips_through_yaml_shape() {
        let yaml = r#"
type: give_item
target: iron_sword
value: 1
condition:
  type: item
  operator: has
  target: gold_coin
"#;
        let action: DialogueAction = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(action.kind, ActionType::GiveItem);
        assert_eq!(action.target.as_deref(), Some("iron_sword"));
        assert_eq!(
            action.condition.map(|c| c.kind),
            Some(ConditionType::Item)
        );
    }
}
