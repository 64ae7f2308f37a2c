//! Collaborators the registration controller talks to over the network.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RegistrationConfig;
use crate::types::{Submission, SubmissionReceipt};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of an event's registration configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch_config(&self, event_id: &str) -> Result<RegistrationConfig, TransportError>;
}

/// Endpoint accepting a completed registration.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(
        &self,
        event_id: &str,
        submission: &Submission,
    ) -> Result<SubmissionReceipt, TransportError>;
}

/// Serves one configuration for every event, from memory.
#[derive(Debug, Clone)]
pub struct StaticConfig(pub RegistrationConfig);

#[async_trait]
impl ConfigSource for StaticConfig {
    async fn fetch_config(&self, _event_id: &str) -> Result<RegistrationConfig, TransportError> {
        Ok(self.0.clone())
    }
}

/// Parses the configuration from a JSON document held in memory.
#[derive(Debug, Clone)]
pub struct JsonConfig(pub String);

#[async_trait]
impl ConfigSource for JsonConfig {
    async fn fetch_config(&self, _event_id: &str) -> Result<RegistrationConfig, TransportError> {
        Ok(serde_json::from_str(&self.0)?)
    }
}

/// Accepts every submission and keeps it, keyed by event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<(String, Submission)>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions received so far, oldest first.
    #[must_use]
    pub fn received(&self) -> Vec<(String, Submission)> {
        self.received
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn submit(
        &self,
        event_id: &str,
        submission: &Submission,
    ) -> Result<SubmissionReceipt, TransportError> {
        let mut received = self
            .received
            .lock()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        received.push((event_id.to_owned(), submission.clone()));
        Ok(SubmissionReceipt {
            status: 201,
            body: serde_json::json!({ "accepted": received.len() }).to_string(),
        })
    }
}
