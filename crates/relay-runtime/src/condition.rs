//! Condition evaluation for switch-node branch selection.

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use jiff::Timestamp;
use relay_core::variable::{VariableStore, VariableValue};
use relay_core::RunId;

use crate::definition::{Condition, ConditionGroup, ConditionOperator, GroupRelation};

/// Tracing target for condition evaluation.
const TRACING_TARGET: &str = "relay_runtime::condition";

/// Evaluates conditions and condition groups against run variables.
///
/// Evaluation fails closed: a missing variable, an unparseable literal,
/// or a store error makes the affected condition `false` rather than
/// aborting branch selection. Failures are logged at `debug` so data
/// corruption stays observable.
#[derive(Clone)]
pub struct ConditionEvaluator {
    variables: Arc<dyn VariableStore>,
}

impl ConditionEvaluator {
    /// Creates an evaluator over the given variable store.
    pub fn new(variables: Arc<dyn VariableStore>) -> Self {
        Self { variables }
    }

    /// Evaluates a single condition for a run.
    pub async fn evaluate_condition(&self, run_id: RunId, condition: &Condition) -> bool {
        let value = match self.variables.get(run_id, &condition.variable_name).await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    run_id = %run_id,
                    variable = %condition.variable_name,
                    error = %err,
                    "Variable lookup failed; condition evaluates false"
                );
                return false;
            }
        };

        match (&value, condition.operator) {
            // Emptiness operators are defined even for unset variables.
            (None, ConditionOperator::IsEmpty) => true,
            (None, ConditionOperator::IsNotEmpty) => false,
            (None, _) => false,
            (Some(value), ConditionOperator::IsEmpty) => value.as_text().is_empty(),
            (Some(value), ConditionOperator::IsNotEmpty) => !value.as_text().is_empty(),
            (Some(value), operator) => compare(value, operator, &condition.value),
        }
    }

    /// Evaluates a condition group for a run.
    ///
    /// `AND` short-circuits on the first false condition, `OR` on the
    /// first true one. An empty condition list evaluates false.
    pub async fn evaluate_group(&self, run_id: RunId, group: &ConditionGroup) -> bool {
        if group.conditions.is_empty() {
            return false;
        }

        match group.relation {
            GroupRelation::And => {
                for condition in &group.conditions {
                    if !self.evaluate_condition(run_id, condition).await {
                        return false;
                    }
                }
                true
            }
            GroupRelation::Or => {
                for condition in &group.conditions {
                    if self.evaluate_condition(run_id, condition).await {
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Selects the output path from a list of groups.
    ///
    /// Groups are evaluated in declaration order; the first matching
    /// group wins. When none match, `default_path` is returned.
    pub async fn select_path<'a>(
        &self,
        run_id: RunId,
        groups: &'a [ConditionGroup],
        default_path: Option<&'a str>,
    ) -> Option<&'a str> {
        for group in groups {
            if self.evaluate_group(run_id, group).await {
                return Some(&group.output_path);
            }
        }
        default_path
    }
}

/// Compares a typed variable value against a string literal.
///
/// The literal is parsed according to the variable's type; a literal
/// that does not parse makes the comparison false.
fn compare(value: &VariableValue, operator: ConditionOperator, literal: &str) -> bool {
    match value {
        VariableValue::Number(number) => match BigDecimal::from_str(literal.trim()) {
            Ok(rhs) => compare_ord(number, &rhs, operator),
            Err(_) => false,
        },
        VariableValue::Timestamp(timestamp) => match literal.parse::<Timestamp>() {
            Ok(rhs) => compare_ord(timestamp, &rhs, operator),
            Err(_) => false,
        },
        VariableValue::Bool(flag) => match literal.trim().parse::<bool>() {
            Ok(rhs) => match operator {
                ConditionOperator::Equals => *flag == rhs,
                ConditionOperator::NotEquals => *flag != rhs,
                _ => false,
            },
            Err(_) => false,
        },
        VariableValue::Text(text) => match operator {
            ConditionOperator::Equals => text == literal,
            ConditionOperator::NotEquals => text != literal,
            ConditionOperator::GreaterThan => text.as_str() > literal,
            ConditionOperator::LessThan => text.as_str() < literal,
            ConditionOperator::Contains => text.contains(literal),
            ConditionOperator::IsEmpty | ConditionOperator::IsNotEmpty => {
                // Handled before typed comparison.
                false
            }
        },
    }
}

fn compare_ord<T: PartialOrd>(lhs: &T, rhs: &T, operator: ConditionOperator) -> bool {
    match operator {
        ConditionOperator::Equals => lhs == rhs,
        ConditionOperator::NotEquals => lhs != rhs,
        ConditionOperator::GreaterThan => lhs > rhs,
        ConditionOperator::LessThan => lhs < rhs,
        _ => false,
    }
}
