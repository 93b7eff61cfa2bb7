//! Portfolio churn report from a CSV export
//!
//! Usage: churn-report <data.csv> [top-n] [all|churned|retained]

use anyhow::{bail, Context, Result};
use churn_prediction_pipeline::{
    config::AppConfig,
    ingest, logging,
    report::{self, ChurnFilter},
};
use serde_json::json;
use tracing::info;

fn parse_filter(raw: &str) -> Result<ChurnFilter> {
    Ok(match raw {
        "all" => ChurnFilter::All,
        "churned" => ChurnFilter::Churned,
        "retained" => ChurnFilter::Retained,
        other => bail!("Unknown filter {other:?}, expected all, churned or retained"),
    })
}

fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    logging::init(&config.logging, &["churn_prediction_pipeline", "churn_report"])?;

    let args: Vec<String> = std::env::args().collect();
    let data_path = args
        .get(1)
        .cloned()
        .or_else(|| {
            config
                .training
                .data_path
                .as_ref()
                .map(|p| p.display().to_string())
        })
        .context("Usage: churn-report <data.csv> [top-n] [all|churned|retained]")?;
    let top_n: usize = match args.get(2) {
        Some(raw) => raw.parse().with_context(|| format!("Invalid top-n {raw:?}"))?,
        None => 10,
    };
    let filter = match args.get(3) {
        Some(raw) => parse_filter(raw)?,
        None => ChurnFilter::All,
    };

    let records = ingest::read_csv_path(&data_path)?;
    let summary = report::summarize(&records);
    info!(
        total = summary.total,
        churn_rate = summary.churn_rate_pct,
        at_risk = summary.at_risk_count,
        revenue = summary.total_revenue,
        "Portfolio summary"
    );

    let output = json!({
        "summary": summary,
        "by_country": report::churn_rate_by_country(&records),
        "top_high_risk": report::top_high_risk(&records, top_n),
        "customers": report::customer_overview(&records, filter),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
