// src/core/conditions.rs
//
// Evaluates the fixed condition grammar shared by structure templates,
// structure-level ACL rules and profile-wide bindings. Conditions compare
// a dotted attribute path resolved against a node's context with a literal
// value; several conditions on one rule always AND together.

use crate::models::{AclCondition, ConditionOperator, Context, ContextValue};
use std::cmp::Ordering;

/// Operators ordered so that two-character forms match before their
/// one-character prefixes.
const OPERATORS: &[(&str, ConditionOperator)] = &[
    ("==", ConditionOperator::Equals),
    ("!=", ConditionOperator::NotEquals),
    (">=", ConditionOperator::GreaterThanOrEqual),
    ("<=", ConditionOperator::LessThanOrEqual),
    (">", ConditionOperator::GreaterThan),
    ("<", ConditionOperator::LessThan),
];

/// Parses a template gating expression like `Stages.Code == П` into a
/// condition. Returns `None` for anything that does not fit the grammar;
/// the generator treats that as "always true".
pub fn parse_expression(expression: &str) -> Option<AclCondition> {
    let expression = expression.trim();
    if expression.is_empty() {
        return None;
    }

    for (symbol, operator) in OPERATORS {
        if let Some(pos) = expression.find(symbol) {
            let lhs = expression[..pos].trim();
            let rhs = expression[pos + symbol.len()..].trim();
            if lhs.is_empty() || rhs.is_empty() {
                return None;
            }
            return Some(AclCondition {
                attribute_path: lhs.to_string(),
                operator: *operator,
                value: rhs.trim_matches('\'').trim_matches('"').to_string(),
            });
        }
    }
    None
}

/// Evaluates one condition against a context. A missing attribute makes
/// the condition false, never an error.
pub fn evaluate(condition: &AclCondition, context: &Context) -> bool {
    let Some(actual) = resolve_attribute_path(&condition.attribute_path, context) else {
        return false;
    };
    let expected = condition.value.as_str();

    match condition.operator {
        ConditionOperator::Equals => eq_ignore_case(&actual, expected),
        ConditionOperator::NotEquals => !eq_ignore_case(&actual, expected),
        ConditionOperator::Contains => contains_ignore_case(&actual, expected),
        ConditionOperator::NotContains => !contains_ignore_case(&actual, expected),
        ConditionOperator::GreaterThan => compare_numeric(&actual, expected) == Ordering::Greater,
        ConditionOperator::LessThan => compare_numeric(&actual, expected) == Ordering::Less,
        ConditionOperator::GreaterThanOrEqual => {
            compare_numeric(&actual, expected) != Ordering::Less
        }
        ConditionOperator::LessThanOrEqual => {
            compare_numeric(&actual, expected) != Ordering::Greater
        }
    }
}

/// AND semantics; zero conditions are unconditionally true.
pub fn evaluate_all(conditions: &[AclCondition], context: &Context) -> bool {
    conditions.iter().all(|c| evaluate(c, context))
}

/// Resolves `Scope.Attr` against the context: nested-record lookup first,
/// then the whole path as a flat key.
pub fn resolve_attribute_path(path: &str, context: &Context) -> Option<String> {
    let mut parts = path.splitn(2, '.');
    let scope = parts.next().unwrap_or_default();
    if let Some(attr) = parts.next() {
        if let Some(ContextValue::Record(record)) = context.get(scope) {
            if let Some(value) = record.get(attr) {
                return Some(value.clone());
            }
        }
    }
    match context.get(path) {
        Some(ContextValue::Scalar(value)) => Some(value.clone()),
        _ => None,
    }
}

/// Numeric comparison when both sides parse as numbers, otherwise a
/// case-insensitive ordinal comparison.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(na), Ok(nb)) => na.partial_cmp(&nb).unwrap_or(Ordering::Equal),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
