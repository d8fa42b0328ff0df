//! Evaluation of form-answer rules
//!
//! Rules are checked in list order and the first match wins. A question
//! left unanswered matches no rule, whatever its operator.

use serde_json::Value;

use crate::models::rule::{DisqualificationRule, FormResponses, RoutingRule, RuleOperator};

/// Common shape of disqualification and routing rules
pub trait RuleCondition {
    fn question_ref(&self) -> &str;
    fn operator(&self) -> RuleOperator;
    fn expected(&self) -> &str;

    fn matches(&self, responses: &FormResponses) -> bool {
        responses
            .get(self.question_ref())
            .map(|answer| evaluate(self.operator(), answer, self.expected()))
            .unwrap_or(false)
    }
}

impl RuleCondition for DisqualificationRule {
    fn question_ref(&self) -> &str {
        &self.question_ref
    }
    fn operator(&self) -> RuleOperator {
        self.operator
    }
    fn expected(&self) -> &str {
        &self.value
    }
}

impl RuleCondition for RoutingRule {
    fn question_ref(&self) -> &str {
        &self.question_ref
    }
    fn operator(&self) -> RuleOperator {
        self.operator
    }
    fn expected(&self) -> &str {
        &self.value
    }
}

/// First rule whose condition holds for `responses`
pub fn first_match<'a, R: RuleCondition>(rules: &'a [R], responses: &FormResponses) -> Option<&'a R> {
    rules.iter().find(|rule| rule.matches(responses))
}

/// Flatten an answer into comparable strings (multi-select answers yield several)
fn answer_values(answer: &Value) -> Vec<String> {
    match answer {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.trim().to_string()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(answer_values).collect(),
        Value::Object(_) => vec![answer.to_string()],
    }
}

fn as_number(answer: &Value) -> Option<f64> {
    match answer {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Apply one operator. String comparisons ignore case.
pub fn evaluate(operator: RuleOperator, answer: &Value, expected: &str) -> bool {
    let values = answer_values(answer);
    if values.is_empty() {
        return false;
    }
    let expected_lower = expected.trim().to_lowercase();

    let equals = || values.iter().any(|v| v.to_lowercase() == expected_lower);
    let contains = || values.iter().any(|v| v.to_lowercase().contains(&expected_lower));

    match operator {
        RuleOperator::Equals => equals(),
        RuleOperator::NotEquals => !equals(),
        RuleOperator::Contains => contains(),
        RuleOperator::NotContains => !contains(),
        RuleOperator::LessThan | RuleOperator::GreaterThan => {
            let (Some(actual), Ok(bound)) = (as_number(answer), expected.trim().parse::<f64>()) else {
                return false;
            };
            if operator == RuleOperator::LessThan {
                actual < bound
            } else {
                actual > bound
            }
        }
    }
}
