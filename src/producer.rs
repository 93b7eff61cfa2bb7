//! NATS publishing for scored customers and request replies

use crate::models::inference::PredictionResult;
use crate::types::{ErrorResponse, ScoredCustomer};
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Publishes scoring outcomes
#[derive(Clone)]
pub struct ScoreProducer {
    client: Client,
    subject: String,
}

impl ScoreProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a scored customer event
    pub async fn publish(&self, scored: &ScoredCustomer) -> Result<()> {
        let payload = serde_json::to_vec(scored)?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            score_id = %scored.score_id,
            email = %scored.email,
            probability = scored.probability_of_churn,
            "Published scored customer"
        );
        Ok(())
    }

    /// Answer a request with its prediction
    pub async fn reply_prediction(&self, reply: Subject, prediction: &PredictionResult) -> Result<()> {
        self.reply(reply, prediction).await
    }

    /// Answer a request with the reason it was rejected
    pub async fn reply_error(&self, reply: Subject, error: &ErrorResponse) -> Result<()> {
        self.reply(reply, error).await
    }

    async fn reply<T: Serialize>(&self, reply: Subject, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        self.client.publish(reply, payload.into()).await?;
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
