//! Type definitions for the churn prediction pipeline

pub mod customer;
pub mod score;

pub use customer::{CategoricalField, CustomerRecord, NumericField, NumericValue};
pub use score::{ErrorResponse, RiskLevel, RiskLevelThresholds, ScoredCustomer};
