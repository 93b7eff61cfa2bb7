//! Rule-based churn risk explanations.
//!
//! Rules look at the raw record only, never at the encoded vector or the
//! model output. Every rule is evaluated, in table order, and each one that
//! fires contributes a reason.

use crate::types::CustomerRecord;
use serde::Serialize;
use std::fmt;

const PROBLEM_ORDER_STATUSES: [&str; 3] = ["returned", "pending", "cancelled"];

/// One named predicate with its message.
#[derive(Clone, Copy)]
pub struct RiskRule {
    pub name: &'static str,
    evaluate: fn(&CustomerRecord) -> Option<String>,
}

impl RiskRule {
    /// Reason text if the rule fires for `record`
    pub fn evaluate(&self, record: &CustomerRecord) -> Option<String> {
        (self.evaluate)(record)
    }
}

impl fmt::Debug for RiskRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskRule").field("name", &self.name).finish()
    }
}

fn low_rating(record: &CustomerRecord) -> Option<String> {
    let ratings = record.ratings.value();
    (ratings < 4.0).then(|| format!("Low rating ({ratings})"))
}

fn negative_feedback(record: &CustomerRecord) -> Option<String> {
    let feedback = &record.feedback;
    (feedback.to_lowercase().contains("bad") || feedback == "Poor")
        .then(|| "Negative feedback".to_string())
}

fn low_spending(record: &CustomerRecord) -> Option<String> {
    let amount = record.total_amount.value();
    (amount < 500.0).then(|| format!("Low spending ({})", amount.trunc() as i64))
}

fn problem_order_status(record: &CustomerRecord) -> Option<String> {
    let status = record.order_status.to_lowercase();
    PROBLEM_ORDER_STATUSES
        .contains(&status.as_str())
        .then(|| format!("Problem order status ({})", record.order_status))
}

fn low_income(record: &CustomerRecord) -> Option<String> {
    (record.income == "Low").then(|| "Low income group".to_string())
}

static RULES: [RiskRule; 5] = [
    RiskRule {
        name: "low_rating",
        evaluate: low_rating,
    },
    RiskRule {
        name: "negative_feedback",
        evaluate: negative_feedback,
    },
    RiskRule {
        name: "low_spending",
        evaluate: low_spending,
    },
    RiskRule {
        name: "problem_order_status",
        evaluate: problem_order_status,
    },
    RiskRule {
        name: "low_income",
        evaluate: low_income,
    },
];

/// The rule table, in evaluation order
pub fn rules() -> &'static [RiskRule] {
    &RULES
}

/// Why a customer looks at risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum RiskExplanation {
    /// Reasons from every rule that fired, in rule order
    Reasons(Vec<String>),
    /// No rule fired; a profile of the inspected fields
    Profile(String),
    /// Reason supplied with the record (reporting only)
    Precomputed(String),
}

impl RiskExplanation {
    /// Reasons as a list; the profile and precomputed forms are one entry
    pub fn reasons(&self) -> Vec<String> {
        match self {
            RiskExplanation::Reasons(reasons) => reasons.clone(),
            RiskExplanation::Profile(text) | RiskExplanation::Precomputed(text) => {
                vec![text.clone()]
            }
        }
    }

    pub fn is_rule_based(&self) -> bool {
        matches!(self, RiskExplanation::Reasons(_))
    }
}

impl fmt::Display for RiskExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskExplanation::Reasons(reasons) => f.write_str(&reasons.join(", ")),
            RiskExplanation::Profile(text) | RiskExplanation::Precomputed(text) => {
                f.write_str(text)
            }
        }
    }
}

/// Explain `record` from the rule table alone.
pub fn explain(record: &CustomerRecord) -> RiskExplanation {
    let reasons: Vec<String> = RULES.iter().filter_map(|r| r.evaluate(record)).collect();
    if reasons.is_empty() {
        RiskExplanation::Profile(profile(record))
    } else {
        RiskExplanation::Reasons(reasons)
    }
}

/// Reporting path: a non-blank `Churn_Reason` wins over the rules.
pub fn explain_for_report(record: &CustomerRecord) -> RiskExplanation {
    match record.churn_reason.as_deref() {
        Some(reason) if !reason.trim().is_empty() => {
            RiskExplanation::Precomputed(reason.to_string())
        }
        _ => explain(record),
    }
}

/// Inspected fields as they arrived; missing numerics print empty
fn profile(record: &CustomerRecord) -> String {
    format!(
        "No specific risk - profile: Ratings: {}, Feedback: {}, Amount: {}, Status: {}, Income: {}",
        record.ratings.raw().unwrap_or(""),
        record.feedback,
        record.total_amount.raw().unwrap_or(""),
        record.order_status,
        record.income
    )
}
