//! Queue-driven job processing.
//!
//! - **JobSource**: where batches of raw messages come from (Redis list or an
//!   event file)
//! - **JobProcessor**: runs each message through generation, persistence,
//!   notification and workflow start, isolating failures per message
//! - **DeadLetterRouter**: receives the verbatim body of every failed message
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//!   │  JobSource   │─────▶│ JobProcessor │─────▶│  Generation  │
//!   │ (Redis/file) │      │ (sequential) │      │ (one retry)  │
//!   └──────────────┘      └──────┬───────┘      └──────────────┘
//!                                │
//!              ┌─────────────────┼─────────────────┐
//!              ▼                 ▼                 ▼
//!        ┌──────────┐     ┌────────────┐    ┌────────────┐
//!        │Reconciler│     │  Notifier  │    │  Workflow  │
//!        └──────────┘     └────────────┘    └────────────┘
//!
//!   any failing step ──▶ DeadLetterRouter (raw body, unchanged)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use adforge::scheduler::{JobProcessor, RedisJobQueue};
//! use std::sync::Arc;
//!
//! let queue = Arc::new(RedisJobQueue::connect("redis://localhost:6379", "companies", "companies-dlq").await?);
//! let processor = JobProcessor::new(generation, store, notifier, workflow, queue.clone());
//! let ack = processor.run(queue.as_ref(), 10).await?;
//! assert_eq!(ack.status_code, 200);
//! ```

pub mod dead_letter;
pub mod job;
pub mod processor;
pub mod queue;
pub mod source;

// Re-export main types for convenience
pub use dead_letter::DeadLetterRouter;
pub use job::{BatchAck, BatchSummary, Job, JobReport, PipelineVariant};
pub use processor::JobProcessor;
pub use queue::{QueueError, RedisJobQueue};
pub use source::{EventFileSource, JobSource};
