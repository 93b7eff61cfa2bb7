//! Churn scoring service
//!
//! Consumes customer records from NATS, scores them against the current
//! artifact, publishes scored customers and answers request/reply callers.

use anyhow::{Context, Result};
use async_nats::Message;
use churn_prediction_pipeline::{
    config::AppConfig,
    consumer::RecordConsumer,
    logging,
    metrics::{MetricsReporter, PipelineMetrics},
    models::{ArtifactStore, InferenceService, PredictionResult},
    producer::ScoreProducer,
    types::{CustomerRecord, ErrorResponse, RiskLevelThresholds},
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging, &["churn_prediction_pipeline", "churn_pipeline"])?;

    info!("Starting churn scoring pipeline");
    info!(
        "Risk levels: medium>={:.2}, high>={:.2}, critical>={:.2}",
        config.scoring.risk_levels.medium,
        config.scoring.risk_levels.high,
        config.scoring.risk_levels.critical
    );

    let store = Arc::new(ArtifactStore::new(&config.artifacts.dir));
    let service = Arc::new(
        InferenceService::from_store(&store, config.scoring.coercion).with_context(|| {
            format!(
                "Failed to load a consistent artifact from {}",
                config.artifacts.dir.display()
            )
        })?,
    );
    info!(
        artifact_id = %service.current().artifact_id(),
        "Serving artifact"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let records = RecordConsumer::new(client.clone(), &config.nats.record_subject);
    let reloads = RecordConsumer::new(client.clone(), &config.nats.reload_subject);
    let producer = Arc::new(ScoreProducer::new(client.clone(), &config.nats.score_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        records = %records.subject(),
        scored = %producer.subject(),
        reload = %reloads.subject(),
        "Starting scoring loop"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let thresholds = Arc::new(config.scoring.risk_levels.clone());

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    let reporter_task = tokio::spawn(reporter.start());

    let mut record_sub = records.subscribe().await?;
    let mut reload_sub = reloads.subscribe().await?;

    loop {
        tokio::select! {
            message = record_sub.next() => {
                let Some(message) = message else { break };
                let permit = semaphore.clone().acquire_owned().await?;

                let service = service.clone();
                let producer = producer.clone();
                let metrics = metrics.clone();
                let thresholds = thresholds.clone();
                let processed_count = processed_count.clone();

                tokio::spawn(async move {
                    handle_record(message, &service, &producer, &metrics, &thresholds).await;

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} rec/s", metrics.get_throughput()),
                            avg_latency_us = stats.mean_us,
                            "Processing milestone"
                        );
                    }
                    drop(permit);
                });
            }
            message = reload_sub.next() => {
                if message.is_none() {
                    break;
                }
                // file reads and decoding stay off the intake loop
                let store = store.clone();
                let service = service.clone();
                tokio::spawn(async move {
                    let loaded = tokio::task::spawn_blocking(move || store.load_current()).await;
                    match loaded {
                        Ok(Ok(artifact)) => {
                            let previous = service.swap(artifact);
                            info!(
                                previous = %previous.artifact_id(),
                                current = %service.current().artifact_id(),
                                "Artifact reloaded"
                            );
                        }
                        Ok(Err(e)) => error!(error = %e, "Reload failed, keeping resident artifact"),
                        Err(e) => error!(error = %e, "Reload task failed, keeping resident artifact"),
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    // wait for in-flight records
    let _ = semaphore.acquire_many(num_workers as u32).await;
    reporter_task.abort();

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn handle_record(
    message: Message,
    service: &InferenceService,
    producer: &ScoreProducer,
    metrics: &PipelineMetrics,
    thresholds: &RiskLevelThresholds,
) {
    let start_time = Instant::now();

    let record = match CustomerRecord::from_json(&message.payload) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Failed to deserialize customer record");
            metrics.record_rejection(None);
            if let Some(reply) = message.reply {
                let response = ErrorResponse::from(&e);
                if let Err(e) = producer.reply_error(reply, &response).await {
                    error!(error = %e, "Failed to send error reply");
                }
            }
            return;
        }
    };

    match service.score(&record, thresholds) {
        Ok(scored) => {
            let processing_time = start_time.elapsed();
            metrics.record_score(
                processing_time,
                scored.probability_of_churn,
                scored.prediction,
                scored.risk_level.as_str(),
            );

            if let Some(reply) = message.reply {
                let prediction = PredictionResult {
                    label: scored.prediction,
                    probability: scored.probability_of_churn,
                };
                if let Err(e) = producer.reply_prediction(reply, &prediction).await {
                    error!(email = %record.email, error = %e, "Failed to send prediction reply");
                }
            }

            if let Err(e) = producer.publish(&scored).await {
                error!(email = %record.email, error = %e, "Failed to publish scored customer");
            } else {
                debug!(
                    email = %record.email,
                    probability = scored.probability_of_churn,
                    risk_level = ?scored.risk_level,
                    processing_time_us = processing_time.as_micros(),
                    "Customer scored"
                );
            }
        }
        Err(e) if e.is_client_error() => {
            let response = ErrorResponse::from(&e);
            metrics.record_rejection(response.field.as_deref());
            warn!(
                email = %record.email,
                field = ?response.field,
                value = ?response.value,
                "Record rejected"
            );
            if let Some(reply) = message.reply {
                if let Err(e) = producer.reply_error(reply, &response).await {
                    error!(error = %e, "Failed to send error reply");
                }
            }
        }
        Err(e) => {
            error!(email = %record.email, error = %e, "Scoring failed");
        }
    }
}
