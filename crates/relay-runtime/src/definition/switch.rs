//! Condition types for switch-node branch selection.

use serde::{Deserialize, Serialize};

/// Comparison operator applied to a run variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ConditionOperator {
    /// Variable equals the literal.
    Equals,
    /// Variable does not equal the literal.
    NotEquals,
    /// Variable is greater than the literal.
    GreaterThan,
    /// Variable is less than the literal.
    LessThan,
    /// Variable contains the literal as a substring.
    Contains,
    /// Variable is unset or renders to an empty string.
    IsEmpty,
    /// Variable is set and renders to a non-empty string.
    IsNotEmpty,
}

/// Boolean relation across the conditions of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupRelation {
    /// Every condition must hold.
    And,
    /// At least one condition must hold.
    Or,
}

/// A single typed comparison against a run variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Name of the run variable to inspect.
    pub variable_name: String,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Literal to compare against, parsed per the variable's type.
    #[serde(default)]
    pub value: String,
    /// Display label from the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A group of conditions mapping to one output path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    /// Definition-scoped group ID.
    #[serde(default)]
    pub id: String,
    /// Relation across this group's conditions.
    pub relation: GroupRelation,
    /// Conditions evaluated under the relation. An empty list never
    /// matches.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Path taken when this group matches.
    pub output_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_serialization() {
        let json = r#"{
            "id": "g1",
            "relation": "AND",
            "conditions": [
                {"variableName": "age", "operator": "greaterThan", "value": "18"}
            ],
            "outputPath": "adult"
        }"#;

        let group: ConditionGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.relation, GroupRelation::And);
        assert_eq!(group.conditions.len(), 1);
        assert_eq!(group.conditions[0].operator, ConditionOperator::GreaterThan);
        assert_eq!(group.output_path, "adult");
    }

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConditionOperator::IsNotEmpty).unwrap(),
            r#""isNotEmpty""#
        );
        assert_eq!(
            serde_json::from_str::<ConditionOperator>(r#""notEquals""#).unwrap(),
            ConditionOperator::NotEquals
        );
    }
}
