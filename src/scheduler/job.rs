//! Job definitions for the scheduler.
//!
//! This module defines the unit of work taken off the inbound queue:
//!
//! - `PipelineVariant`: which flavour of the pipeline a batch runs under
//! - `Job`: the fields extracted from one queue message, plus its raw body
//! - `JobReport`: what a successfully processed job produced
//! - `BatchAck` / `BatchSummary`: the batch-level acknowledgment and its log line

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JobError;
use crate::store::WriteOutcome;

/// Flavour of the pipeline.
///
/// - `Research`: the first pass over a business. Messages carry personas and
///   an email address; the stakeholder is emailed.
/// - `Refresh`: regenerates ad copy for a business that already has research.
///   The previous document is sent along as context and the stakeholder is
///   notified through the chat webhook mapped to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    #[default]
    Research,
    Refresh,
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineVariant::Research => write!(f, "research"),
            PipelineVariant::Refresh => write!(f, "refresh"),
        }
    }
}

impl FromStr for PipelineVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "research" => Ok(PipelineVariant::Research),
            "refresh" => Ok(PipelineVariant::Refresh),
            other => Err(format!(
                "unknown pipeline variant '{}' (expected 'research' or 'refresh')",
                other
            )),
        }
    }
}

/// Personas as they appear on the wire.
///
/// Producers have sent both a proper array and a JSON-encoded array string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePersonas {
    List(Vec<String>),
    Encoded(String),
}

impl WirePersonas {
    fn into_list(self) -> Result<Vec<String>, JobError> {
        match self {
            WirePersonas::List(list) => Ok(list),
            WirePersonas::Encoded(raw) => serde_json::from_str::<Vec<String>>(&raw)
                .map_err(|e| JobError::InvalidMessage(format!("personas is not a list: {}", e))),
        }
    }
}

/// A unit of work extracted from one queue message.
#[derive(Debug, Clone)]
pub struct Job {
    /// Business key: names the business and its document collection.
    pub business_name: String,
    /// Personas the research is aimed at (research variant).
    pub personas: Vec<String>,
    /// Stakeholder address (research variant).
    pub email: Option<String>,
}

impl Job {
    /// Extracts a job from a raw queue message body.
    ///
    /// # Errors
    ///
    /// - `JobError::InvalidMessage` if the body is not a JSON object or a
    ///   field has the wrong shape
    /// - `JobError::MissingField` if `business_name`, or a field the variant
    ///   requires, is absent or empty
    pub fn parse(raw_body: &str, variant: PipelineVariant) -> Result<Self, JobError> {
        let value: Value = serde_json::from_str(raw_body)
            .map_err(|e| JobError::InvalidMessage(format!("body is not JSON: {}", e)))?;

        let Value::Object(payload) = value else {
            return Err(JobError::InvalidMessage(
                "body is not a JSON object".to_string(),
            ));
        };

        let business_name = payload
            .get("business_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(JobError::MissingField("business_name"))?
            .to_string();

        let personas = match payload.get("personas") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => serde_json::from_value::<WirePersonas>(raw.clone())
                .map_err(|e| JobError::InvalidMessage(format!("personas: {}", e)))?
                .into_list()?,
        };

        let email = payload
            .get("email")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string);

        if variant == PipelineVariant::Research {
            if personas.is_empty() {
                return Err(JobError::MissingField("personas"));
            }
            if email.is_none() {
                return Err(JobError::MissingField("email"));
            }
        }

        Ok(Self {
            business_name,
            personas,
            email,
        })
    }

    /// Personas in the single-line form the generation service expects.
    pub fn persona_line(&self) -> String {
        self.personas.join(", ")
    }

    /// Extra fields handed to the downstream workflow.
    pub fn workflow_fields(&self, variant: PipelineVariant) -> Map<String, Value> {
        let mut fields = Map::new();
        if variant == PipelineVariant::Research {
            if let Some(ref email) = self.email {
                fields.insert("email".to_string(), Value::String(email.clone()));
            }
        }
        fields
    }
}

/// What a successfully processed job produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// The business that was processed.
    pub business_name: String,
    /// Number of generation attempts used.
    pub attempts: u32,
    /// The document write.
    pub write: WriteOutcome,
    /// Whether the stakeholder notification went out.
    pub notified: bool,
    /// Identifier of the started workflow execution.
    pub execution_id: String,
    /// Completion message; degraded when notification failed.
    pub message: String,
}

/// Batch-level acknowledgment.
///
/// Always reports success once the batch ran to completion; individual job
/// failures are visible only through the dead-letter queue and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAck {
    pub status_code: u16,
    pub message: String,
}

impl BatchAck {
    /// The fixed success acknowledgment.
    pub fn success() -> Self {
        Self {
            status_code: 200,
            message: "All companies processed successfully".to_string(),
        }
    }
}

/// Per-batch tallies, logged when a batch finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Jobs that completed every step.
    pub succeeded: usize,
    /// Completed jobs whose notification failed.
    pub notify_degraded: usize,
    /// Jobs re-published to the dead-letter queue.
    pub dead_lettered: usize,
    /// Jobs whose dead-letter publish also failed.
    pub dropped: usize,
}

impl BatchSummary {
    /// Total number of jobs seen.
    pub fn total(&self) -> usize {
        self.succeeded + self.dead_lettered + self.dropped
    }
}
