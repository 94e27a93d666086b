//! Per-batch job processing.
//!
//! Each message of a batch goes through the same steps, one message at a
//! time:
//!
//! 1. parse the body into a [`Job`]
//! 2. look up the business's latest complete document
//! 3. call the generation service (one retry)
//! 4. validate the result and write it (insert or in-place update)
//! 5. notify the stakeholder, best effort
//! 6. start the downstream workflow
//!
//! A failure in any step other than 5 ends the job and its raw body is
//! re-published to the dead-letter queue. Jobs never affect each other and
//! the batch always acknowledges success.

use std::sync::Arc;

use chrono::Local;
use tracing::{error, info, warn};

use super::dead_letter::DeadLetterRouter;
use super::job::{BatchAck, BatchSummary, Job, JobReport, PipelineVariant};
use super::queue::QueueError;
use super::source::JobSource;
use crate::error::{JobError, NotifyError};
use crate::generation::{call_with_retry, GeneratedResult, GenerationRequest, GenerationService};
use crate::notify::{self, Notifier};
use crate::store::{DocumentStore, ExistingRecord, Reconciler, WebhookDirectory};
use crate::workflow::WorkflowTrigger;

/// Drives jobs through generation, persistence, notification and workflow.
pub struct JobProcessor {
    generation: Arc<dyn GenerationService>,
    reconciler: Reconciler,
    notifier: Arc<dyn Notifier>,
    webhooks: Option<Arc<dyn WebhookDirectory>>,
    workflow: Arc<dyn WorkflowTrigger>,
    router: Arc<dyn DeadLetterRouter>,
    variant: PipelineVariant,
}

impl JobProcessor {
    /// Creates a processor for the research variant.
    pub fn new(
        generation: Arc<dyn GenerationService>,
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        workflow: Arc<dyn WorkflowTrigger>,
        router: Arc<dyn DeadLetterRouter>,
    ) -> Self {
        Self {
            generation,
            reconciler: Reconciler::new(store),
            notifier,
            webhooks: None,
            workflow,
            router,
            variant: PipelineVariant::default(),
        }
    }

    /// Sets the pipeline variant.
    pub fn with_variant(mut self, variant: PipelineVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets where refresh notifications look up their webhook.
    pub fn with_webhooks(mut self, webhooks: Arc<dyn WebhookDirectory>) -> Self {
        self.webhooks = Some(webhooks);
        self
    }

    /// Receives one batch from `source` and processes it.
    ///
    /// # Errors
    ///
    /// Only a failure to receive the batch is an error; job failures are
    /// dead-lettered and logged.
    pub async fn run(&self, source: &dyn JobSource, max: usize) -> Result<BatchAck, QueueError> {
        let bodies = source.receive_batch(max).await?;
        if bodies.is_empty() {
            info!("No messages to process");
        } else {
            self.process_batch(&bodies).await;
        }
        Ok(BatchAck::success())
    }

    /// Processes every body of a batch in order and returns the tallies.
    pub async fn process_batch(&self, bodies: &[String]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        info!(
            batch_size = bodies.len(),
            variant = %self.variant,
            "Processing batch"
        );

        for body in bodies {
            match self.process_job(body).await {
                Ok(report) => {
                    summary.succeeded += 1;
                    if !report.notified {
                        summary.notify_degraded += 1;
                    }
                    info!(
                        business = %report.business_name,
                        attempts = report.attempts,
                        document_id = report.write.document_id,
                        execution_id = %report.execution_id,
                        "{}",
                        report.message
                    );
                }
                Err(e) => {
                    let business = business_hint(body);
                    error!(
                        business = %business,
                        error = %e,
                        "Failed to process company, moving to dead letter queue"
                    );

                    match self.router.route(body).await {
                        Ok(()) => {
                            summary.dead_lettered += 1;
                            info!(
                                business = %business,
                                queue = %self.router.destination(),
                                "Moved company to dead letter queue"
                            );
                        }
                        Err(route_err) => {
                            summary.dropped += 1;
                            error!(
                                business = %business,
                                error = %route_err,
                                "Failed to move company to dead letter queue, dropping"
                            );
                        }
                    }
                }
            }
        }

        info!(
            total = summary.total(),
            succeeded = summary.succeeded,
            notify_degraded = summary.notify_degraded,
            dead_lettered = summary.dead_lettered,
            dropped = summary.dropped,
            "Batch complete"
        );

        summary
    }

    /// Runs one message through every step.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. Notification failures are not
    /// errors; they show up as `notified == false` on the report.
    pub async fn process_job(&self, raw_body: &str) -> Result<JobReport, JobError> {
        let job = Job::parse(raw_body, self.variant)?;
        let business = job.business_name.as_str();

        let existing = self.reconciler.find_existing(business).await?;
        let request = self.build_request(&job, existing.as_ref());

        let generated = call_with_retry(self.generation.as_ref(), &request).await?;
        let result = GeneratedResult::from_value(generated.body)?;

        let today = Local::now().date_naive();
        let write = self
            .reconciler
            .reconcile(business, &result, existing.as_ref(), today)
            .await?;

        let (notified, message) = match self.notify(&job, &result).await {
            Ok(()) => (true, format!("Processing complete for company: {}", business)),
            Err(e) => {
                warn!(business = %business, error = %e, "Failed to send notification");
                (
                    false,
                    format!(
                        "Processing complete for company: {} (notification failed: {})",
                        business, e
                    ),
                )
            }
        };

        let execution_id = self
            .workflow
            .start(business, job.workflow_fields(self.variant))
            .await?;
        info!(business = %business, execution_id = %execution_id, "Started workflow execution");

        Ok(JobReport {
            business_name: job.business_name.clone(),
            attempts: generated.attempts,
            write,
            notified,
            execution_id,
            message,
        })
    }

    fn build_request(&self, job: &Job, existing: Option<&ExistingRecord>) -> GenerationRequest {
        let request = GenerationRequest::new(job.business_name.as_str());
        match self.variant {
            PipelineVariant::Research => request.with_persona(job.persona_line()),
            PipelineVariant::Refresh => match existing {
                Some(record) => request.with_existing_data(record.context()),
                None => request,
            },
        }
    }

    async fn notify(&self, job: &Job, result: &GeneratedResult) -> Result<(), NotifyError> {
        let business = job.business_name.as_str();
        match self.variant {
            PipelineVariant::Research => {
                let email = job
                    .email
                    .as_deref()
                    .ok_or_else(|| NotifyError::NoRecipient(business.to_string()))?;
                self.notifier
                    .notify(
                        email,
                        notify::COMPLETION_SUBJECT,
                        &notify::completion_body(business),
                    )
                    .await
            }
            PipelineVariant::Refresh => {
                let webhooks = self
                    .webhooks
                    .as_ref()
                    .ok_or_else(|| NotifyError::NoRecipient(business.to_string()))?;
                let url = webhooks
                    .webhook_for(business)
                    .await?
                    .ok_or_else(|| NotifyError::NoRecipient(business.to_string()))?;
                self.notifier
                    .notify(
                        &url,
                        notify::REFRESH_SUBJECT,
                        &notify::refresh_body(business, result),
                    )
                    .await
            }
        }
    }
}

/// Best-effort business name for log lines about a body that may not parse.
fn business_hint(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("business_name")?.as_str().map(str::to_string))
        .unwrap_or_else(|| "<unknown>".to_string())
}
