//! Error types for adforge operations.
//!
//! Defines the error taxonomy of the job processing core:
//! - Generation service calls and the retry budget
//! - Document store persistence and reconciliation
//! - Notifications and workflow starts
//! - Dead-letter routing
//! - The per-job boundary that decides dead-lettering
//!
//! Configuration and queue errors live next to their modules
//! (`config::ConfigError`, `scheduler::QueueError`).

use thiserror::Error;

/// Errors from a single call to the external generation service.
///
/// Every variant is retryable by the caller; the client itself never retries.
#[derive(Debug, Error)]
pub enum ExternalCallError {
    #[error("Generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generation service request failed: {0}")]
    Transport(String),

    #[error("Generation service returned an unreadable body: {0}")]
    InvalidBody(String),
}

/// Raised once the retry budget is spent.
///
/// `last_error` is the failure of the final attempt, passed through unchanged.
#[derive(Debug, Error)]
#[error("Generation failed after {attempts} attempts: {last_error}")]
pub struct ExhaustedRetries {
    pub attempts: u32,
    #[source]
    pub last_error: ExternalCallError,
}

/// Errors that can occur while talking to the document store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Document store connection failed: {0}")]
    Connection(String),

    #[error("Document store query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored document {id} is not a JSON object")]
    CorruptDocument { id: i64 },
}

/// Errors that can occur while validating a generation response.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Generated result is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Generated result field '{field}' is malformed: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Generated result is not a JSON object")]
    NotAnObject,
}

/// Errors that can occur while notifying stakeholders.
///
/// These never dead-letter a job; they only degrade its completion message.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("No notification recipient for '{0}'")]
    NoRecipient(String),

    #[error("Notification request failed: {0}")]
    Request(String),

    #[error("Notification part {part}/{total} rejected with HTTP {status}: {body}")]
    PartRejected {
        part: usize,
        total: usize,
        status: u16,
        body: String,
    },

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Message limit {0} cannot hold a part label and any content")]
    LimitTooSmall(usize),

    #[error("Recipient lookup failed: {0}")]
    Directory(#[from] PersistenceError),
}

/// Errors that can occur while starting a downstream workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to start workflow '{workflow_id}': {reason}")]
    StartFailed { workflow_id: String, reason: String },

    #[error("Workflow input serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raised when a job body cannot be re-published to the dead-letter queue.
///
/// Terminal: the job is logged and dropped.
#[derive(Debug, Error)]
#[error("Failed to publish to dead-letter queue '{queue}': {reason}")]
pub struct RouterError {
    pub queue: String,
    pub reason: String,
}

/// Failures caught at the per-job boundary. Every variant dead-letters the job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid queue message: {0}")]
    InvalidMessage(String),

    #[error("Queue message is missing required field '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    Generation(#[from] ExhaustedRetries),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}
