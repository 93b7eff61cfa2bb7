//! Portfolio-level churn metrics over a customer collection

use crate::explain::{explain_for_report, RiskExplanation};
use crate::types::CustomerRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Risk score shown for churned customers in the overview
pub const CHURNED_RISK_SCORE: u8 = 85;
/// Risk score shown for retained customers in the overview
pub const RETAINED_RISK_SCORE: u8 = 20;

/// Headline dashboard numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(rename = "total_customers")]
    pub total: usize,
    /// Percentage of churned customers, one decimal
    #[serde(rename = "churn_rate")]
    pub churn_rate_pct: f64,
    #[serde(rename = "at_risk_customers")]
    pub at_risk_count: usize,
    /// Sum of `Total_Amount`, two decimals
    pub total_revenue: f64,
}

/// Churn counts for one country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryChurn {
    pub country: String,
    pub customers: usize,
    pub churned: usize,
    pub churn_rate_pct: f64,
}

/// A churned customer ranked by spend, with the reason shown on the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighRiskCustomer {
    pub name: String,
    pub email: String,
    pub total_amount: f64,
    pub reason: RiskExplanation,
}

/// Row of the customer listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerOverview {
    pub name: String,
    pub email: String,
    pub churn_status: String,
    pub risk_score: u8,
}

/// Which customers the listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnFilter {
    #[default]
    All,
    Churned,
    Retained,
}

impl ChurnFilter {
    fn accepts(self, record: &CustomerRecord) -> bool {
        match self {
            ChurnFilter::All => true,
            ChurnFilter::Churned => record.is_churned(),
            ChurnFilter::Retained => record.churn.as_deref() == Some("No"),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn rate_pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_to(100.0 * part as f64 / total as f64, 1)
    }
}

/// Totals, churn rate and revenue over `records`.
///
/// An empty collection yields zeros and a warning instead of a division by
/// zero.
pub fn summarize(records: &[CustomerRecord]) -> PortfolioSummary {
    if records.is_empty() {
        warn!("EmptyCollectionWarning: summarizing an empty customer collection");
    }

    let total = records.len();
    let at_risk_count = records.iter().filter(|r| r.is_churned()).count();
    let revenue: f64 = records.iter().map(|r| r.total_amount.value()).sum();

    PortfolioSummary {
        total,
        churn_rate_pct: rate_pct(at_risk_count, total),
        at_risk_count,
        total_revenue: round_to(revenue, 2),
    }
}

/// Churn rate per country, highest rate first.
pub fn churn_rate_by_country(records: &[CustomerRecord]) -> Vec<CountryChurn> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = counts.entry(record.country.as_str()).or_default();
        entry.0 += 1;
        if record.is_churned() {
            entry.1 += 1;
        }
    }

    let mut rows: Vec<CountryChurn> = counts
        .into_iter()
        .map(|(country, (customers, churned))| CountryChurn {
            country: country.to_string(),
            customers,
            churned,
            churn_rate_pct: rate_pct(churned, customers),
        })
        .collect();

    // stable sort keeps the alphabetical order among equal rates
    rows.sort_by(|a, b| b.churn_rate_pct.total_cmp(&a.churn_rate_pct));
    rows
}

/// The `n` churned customers with the highest spend.
pub fn top_high_risk(records: &[CustomerRecord], n: usize) -> Vec<HighRiskCustomer> {
    let mut churned: Vec<&CustomerRecord> = records.iter().filter(|r| r.is_churned()).collect();
    churned.sort_by(|a, b| {
        b.total_amount
            .value()
            .total_cmp(&a.total_amount.value())
    });

    churned
        .into_iter()
        .take(n)
        .map(|r| HighRiskCustomer {
            name: r.name.clone(),
            email: r.email.clone(),
            total_amount: r.total_amount.value(),
            reason: explain_for_report(r),
        })
        .collect()
}

/// Customer listing with the label-based risk score.
pub fn customer_overview(records: &[CustomerRecord], filter: ChurnFilter) -> Vec<CustomerOverview> {
    records
        .iter()
        .filter(|r| filter.accepts(r))
        .map(|r| CustomerOverview {
            name: r.name.clone(),
            email: r.email.clone(),
            churn_status: r.churn.clone().unwrap_or_default(),
            risk_score: if r.is_churned() {
                CHURNED_RISK_SCORE
            } else {
                RETAINED_RISK_SCORE
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NumericValue;

    fn customer(name: &str, country: &str, churn: &str, amount: f64) -> CustomerRecord {
        CustomerRecord {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            country: country.to_string(),
            churn: Some(churn.to_string()),
            total_amount: NumericValue::from(amount),
            ratings: NumericValue::from(9.0),
            feedback: "Great".to_string(),
            order_status: "Delivered".to_string(),
            income: "High".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summarize() {
        let records = vec![
            customer("A", "US", "Yes", 100.0),
            customer("B", "US", "No", 200.0),
            customer("C", "UK", "Yes", 300.0),
        ];

        assert_eq!(
            summarize(&records),
            PortfolioSummary {
                total: 3,
                churn_rate_pct: 66.7,
                at_risk_count: 2,
                total_revenue: 600.0,
            }
        );
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(
            summarize(&[]),
            PortfolioSummary {
                total: 0,
                churn_rate_pct: 0.0,
                at_risk_count: 0,
                total_revenue: 0.0,
            }
        );
    }

    #[test]
    fn test_summary_wire_names() {
        let json = serde_json::to_value(summarize(&[customer("A", "US", "Yes", 10.255)])).unwrap();
        assert_eq!(json["total_customers"], 1);
        assert_eq!(json["churn_rate"], 100.0);
        assert_eq!(json["at_risk_customers"], 1);
        assert!(json.get("total_revenue").is_some());
    }

    #[test]
    fn test_revenue_treats_garbage_as_zero() {
        let mut bad = customer("A", "US", "No", 0.0);
        bad.total_amount = NumericValue::from("oops");
        let records = vec![bad, customer("B", "US", "No", 1.005)];
        assert_eq!(summarize(&records).total_revenue, 1.0);
    }

    #[test]
    fn test_churn_rate_by_country() {
        let records = vec![
            customer("A", "US", "Yes", 100.0),
            customer("B", "US", "No", 200.0),
            customer("C", "UK", "Yes", 300.0),
            customer("D", "DE", "No", 300.0),
        ];

        let rows = churn_rate_by_country(&records);
        let order: Vec<&str> = rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(order, vec!["UK", "US", "DE"]);
        assert_eq!(rows[1].churn_rate_pct, 50.0);
        assert_eq!(rows[1].customers, 2);
    }

    #[test]
    fn test_top_high_risk() {
        let mut with_reason = customer("C", "UK", "Yes", 300.0);
        with_reason.churn_reason = Some("Moved abroad".to_string());
        let records = vec![
            customer("A", "US", "Yes", 100.0),
            customer("B", "US", "No", 9000.0),
            with_reason,
            customer("D", "DE", "Yes", 250.0),
        ];

        let top = top_high_risk(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "C");
        assert_eq!(top[0].reason, RiskExplanation::Precomputed("Moved abroad".to_string()));
        assert_eq!(top[1].name, "D");
        assert_eq!(top[1].reason.reasons(), vec!["Low spending (250)".to_string()]);
    }

    #[test]
    fn test_customer_overview_filters() {
        let records = vec![
            customer("A", "US", "Yes", 100.0),
            customer("B", "US", "No", 200.0),
        ];

        let all = customer_overview(&records, ChurnFilter::All);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].risk_score, CHURNED_RISK_SCORE);
        assert_eq!(all[1].risk_score, RETAINED_RISK_SCORE);

        let churned = customer_overview(&records, ChurnFilter::Churned);
        assert_eq!(churned.len(), 1);
        assert_eq!(churned[0].name, "A");

        let retained = customer_overview(&records, ChurnFilter::Retained);
        assert_eq!(retained[0].churn_status, "No");
    }
}
