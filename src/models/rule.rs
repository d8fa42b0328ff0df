//! Qualification and routing rules evaluated against form responses

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Answers to a booking form, keyed by question reference
pub type FormResponses = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    LessThan,
    GreaterThan,
}

/// Marks a lead unqualified when its answer matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DisqualificationRule {
    pub question_ref: String,
    pub operator: RuleOperator,
    pub value: String,
    /// Reason recorded on the lead when the rule fires
    pub outcome: String,
}

/// Sends the booking to a specific host when its answer matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoutingRule {
    pub question_ref: String,
    pub operator: RuleOperator,
    pub value: String,
    /// Target host
    pub outcome: Uuid,
}
