//! Condition evaluation.
//!
//! Conditions gate choices and actions. Evaluation dispatches on the
//! condition type, compares with the operator, then applies `negate`.
//! Values that cannot be ordered (an unset variable, mismatched types)
//! simply compare as `false` before negation. Only a malformed rule, such
//! as an unknown type or operator or an unparseable time or chance, yields
//! `false` whatever `negate` says.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use taleweave_domain::{ComparisonOperator, ConditionType, DialogueCondition, VariableContext};

use crate::infrastructure::ports::{ClockPort, PortError, RandomPort};

/// Why a rule could not be evaluated or executed.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("unknown rule type")]
    UnknownType,
    #[error("unknown comparison operator")]
    UnknownOperator,
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("collaborator failed: {0}")]
    Collaborator(#[from] PortError),
}

pub struct ConditionEvaluator {
    random: Arc<dyn RandomPort>,
    clock: Arc<dyn ClockPort>,
}

impl ConditionEvaluator {
    pub fn new(random: Arc<dyn RandomPort>, clock: Arc<dyn ClockPort>) -> Self {
        Self { random, clock }
    }

    /// Evaluate a condition against the turn context.
    pub fn evaluate(&self, condition: &DialogueCondition, context: &VariableContext) -> bool {
        match self.check(condition, context) {
            Ok(result) => result != condition.negate,
            Err(e) => {
                tracing::warn!(
                    kind = ?condition.kind,
                    target = %condition.target,
                    error = %e,
                    "Condition could not be evaluated, treating as false"
                );
                false
            }
        }
    }

    /// The un-negated result.
    fn check(
        &self,
        condition: &DialogueCondition,
        context: &VariableContext,
    ) -> Result<bool, RuleError> {
        let op = condition.operator;
        let expected = condition.value.as_ref();
        let player = &context.player;
        let target = condition.target.as_str();

        match condition.kind {
            ConditionType::Variable => compare(op, context.variable(target), expected),
            ConditionType::Flag => {
                let has = player.has_flag(target);
                Ok(if op == ComparisonOperator::Has { has } else { !has })
            }
            ConditionType::Item => {
                let count = player.item_count(target);
                match op {
                    ComparisonOperator::Has => Ok(count > 0),
                    ComparisonOperator::NotHas => Ok(count == 0),
                    _ => compare(op, Some(&Value::from(count)), expected),
                }
            }
            ConditionType::Quest => match player.quests.get(target) {
                None => Ok(matches!(
                    op,
                    ComparisonOperator::NotHas | ComparisonOperator::NotEquals
                )),
                Some(quest) => compare(op, Some(&Value::from(quest.status.as_str())), expected),
            },
            ConditionType::Stat => {
                let stat = player.stats.get(target).copied().unwrap_or(0.0);
                compare_numeric(op, stat, expected)
            }
            ConditionType::Skill => {
                let skill = player.skills.get(target).copied().unwrap_or(0.0);
                compare_numeric(op, skill, expected)
            }
            ConditionType::Level => compare_numeric(op, f64::from(player.level), expected),
            ConditionType::Time => {
                let at = timestamp(expected.ok_or(RuleError::Missing("timestamp"))?)?;
                let elapsed_ms = (self.clock.now() - at).num_milliseconds();
                compare(op, Some(&Value::from(elapsed_ms)), Some(&Value::from(0)))
            }
            ConditionType::Random => {
                let chance = match expected {
                    None | Some(Value::Null) => 0.5,
                    Some(v) => v
                        .as_f64()
                        .ok_or_else(|| RuleError::InvalidValue(v.to_string()))?,
                };
                Ok(self.random.gen_unit() < chance)
            }
            ConditionType::Unknown => Err(RuleError::UnknownType),
        }
    }
}

fn compare_numeric(
    op: ComparisonOperator,
    actual: f64,
    expected: Option<&Value>,
) -> Result<bool, RuleError> {
    compare(op, Some(&Value::from(actual)), expected)
}

/// Apply a comparison operator. An absent value and JSON null are the same.
fn compare(
    op: ComparisonOperator,
    actual: Option<&Value>,
    expected: Option<&Value>,
) -> Result<bool, RuleError> {
    let actual = actual.filter(|v| !v.is_null());
    let expected = expected.filter(|v| !v.is_null());

    match op {
        ComparisonOperator::Equals => Ok(loosely_equal(actual, expected)),
        ComparisonOperator::NotEquals => Ok(!loosely_equal(actual, expected)),
        ComparisonOperator::Has => Ok(actual.is_some()),
        ComparisonOperator::NotHas => Ok(actual.is_none()),
        ComparisonOperator::Contains => Ok(match (actual, expected) {
            (Some(Value::String(haystack)), Some(Value::String(needle))) => {
                haystack.contains(needle.as_str())
            }
            (Some(Value::Array(items)), Some(needle)) => {
                items.iter().any(|item| loosely_equal(Some(item), Some(needle)))
            }
            _ => false,
        }),
        ComparisonOperator::GreaterThan => Ok(order(actual, expected).is_some_and(Ordering::is_gt)),
        ComparisonOperator::LessThan => Ok(order(actual, expected).is_some_and(Ordering::is_lt)),
        ComparisonOperator::GreaterEqual => Ok(order(actual, expected).is_some_and(Ordering::is_ge)),
        ComparisonOperator::LessEqual => Ok(order(actual, expected).is_some_and(Ordering::is_le)),
        ComparisonOperator::Unknown => Err(RuleError::UnknownOperator),
    }
}

fn loosely_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64() == y.as_f64(),
        (a, b) => a == b,
    }
}

/// `None` when the values have no common order.
fn order(actual: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
    match (actual, expected) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
        _ => None,
    }
}

/// An RFC 3339 string or epoch milliseconds.
fn timestamp(value: &Value) -> Result<DateTime<Utc>, RuleError> {
    let invalid = || RuleError::InvalidValue(value.to_string());
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| invalid()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
