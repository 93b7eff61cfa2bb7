//! Synthetic customer producer
//!
//! Publishes generated customer records to NATS for pipeline testing, or
//! writes them as a CSV corpus for `train-model`.
//!
//! Usage:
//!   customer-producer [nats_url] [subject] [count] [churn_rate] [delay_ms]
//!   customer-producer --csv [count] [churn_rate] > customers.csv

use churn_prediction_pipeline::types::{CustomerRecord, NumericValue};
use rand::Rng;
use std::io;
use std::time::Duration;
use tracing::{info, warn};

const COUNTRIES: [&str; 4] = ["US", "UK", "CA", "DE"];

/// Customer generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    fn base(&mut self) -> CustomerRecord {
        self.counter += 1;
        CustomerRecord {
            name: format!("Customer {:06}", self.counter),
            email: format!("customer{:06}@example.com", self.counter),
            gender: self.random_choice(&["Male", "Female"]).to_string(),
            age: NumericValue::from(self.rng.gen_range(18..75) as i64),
            country: self.random_choice(&COUNTRIES).to_string(),
            ..Default::default()
        }
    }

    /// A satisfied, high-spending customer
    fn generate_retained(&mut self) -> CustomerRecord {
        let mut record = self.base();
        record.income = self.random_choice(&["Medium", "High"]).to_string();
        record.total_amount = NumericValue::from(self.rng.gen_range(800.0..6000.0_f64).round());
        record.feedback = self.random_choice(&["Good", "Excellent", "Average"]).to_string();
        record.order_status = self.random_choice(&["Delivered", "Shipped"]).to_string();
        record.ratings = NumericValue::from(self.rng.gen_range(6..=10) as i64);
        record.churn = Some("No".to_string());
        record
    }

    /// A customer showing churn signals
    fn generate_at_risk(&mut self) -> CustomerRecord {
        let mut record = self.base();
        record.income = self.random_choice(&["Low", "Medium"]).to_string();
        record.total_amount = NumericValue::from(self.rng.gen_range(50.0..700.0_f64).round());
        record.feedback = self.random_choice(&["Bad", "Poor", "Average"]).to_string();
        record.order_status = self
            .random_choice(&["Returned", "Pending", "Cancelled", "Delivered"])
            .to_string();
        record.ratings = NumericValue::from(self.rng.gen_range(1..=5) as i64);
        record.churn = Some("Yes".to_string());
        record
    }

    fn generate(&mut self, churn_rate: f64) -> CustomerRecord {
        if self.rng.gen_bool(churn_rate) {
            self.generate_at_risk()
        } else {
            self.generate_retained()
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn write_csv(count: u64, churn_rate: f64) -> anyhow::Result<()> {
    let mut generator = CustomerGenerator::new();
    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    for _ in 0..count {
        writer.serialize(generator.generate(churn_rate))?;
    }
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("customer_producer=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.get(1).map(String::as_str) == Some("--csv") {
        let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(500);
        let churn_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.3);
        info!(count, churn_rate, "Writing synthetic corpus");
        return write_csv(count, churn_rate.clamp(0.0, 1.0));
    }

    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("customers.score");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let churn_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.3_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        churn_rate = churn_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, churn_rate);
        }
    };

    let mut generator = CustomerGenerator::new();
    let mut at_risk = 0;

    for i in 0..count {
        let record = generator.generate(churn_rate);
        if record.is_churned() {
            at_risk += 1;
        }

        let payload = serde_json::to_vec(&record)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!("Published {}/{} customers ({} at risk)", i + 1, count, at_risk);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    client.flush().await?;

    info!("Completed! Published {} customers ({} at risk)", count, at_risk);
    Ok(())
}

fn run_dry_mode(count: u64, churn_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = CustomerGenerator::new();
    for i in 0..count {
        let record = generator.generate(churn_rate);
        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample customer {}:\n{}", i + 1, serde_json::to_string_pretty(&record)?);
        }
    }

    info!("Dry run completed. Generated {} customers.", count);
    Ok(())
}
