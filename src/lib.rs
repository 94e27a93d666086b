//! adforge: queue-driven ad research pipeline.
//!
//! Business records are taken off a queue, sent to an external generation
//! service with a single retry, reconciled against the business's previous
//! document, announced to the stakeholder and handed to a downstream
//! workflow. A record that fails any required step is re-published, byte for
//! byte, to a dead-letter queue.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used error types
pub use config::{ConfigError, Settings};
pub use error::{
    ExhaustedRetries, ExternalCallError, JobError, NotifyError, PersistenceError, ReconcileError,
    RouterError, WorkflowError,
};
