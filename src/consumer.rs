//! NATS subscriptions for inbound customer records and reload triggers

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes to one inbound subject
pub struct RecordConsumer {
    client: Client,
    subject: String,
}

impl RecordConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
