//! Insert-versus-update decision for generated results.
//!
//! A business whose latest document is complete gets that document updated
//! in place: only the keyword list, the ad text list and the date stamp are
//! overwritten. Any other business gets a fresh document. Exactly one write
//! happens per call.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::document::{DocumentStore, ExistingRecord};
use crate::error::PersistenceError;
use crate::generation::GeneratedResult;

/// How a result was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Inserted,
    Updated,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub mode: WriteMode,
    pub document_id: i64,
    /// False when an update matched nothing or changed nothing.
    pub modified: bool,
}

/// Writes generated results against prior state in a [`DocumentStore`].
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Looks up the latest document for `business_key`.
    ///
    /// Returns `None` when there is none or it is incomplete.
    pub async fn find_existing(
        &self,
        business_key: &str,
    ) -> Result<Option<ExistingRecord>, PersistenceError> {
        let latest = self.store.latest(business_key).await?;
        Ok(latest.and_then(ExistingRecord::from_document))
    }

    /// Persists `result`, updating `existing` if given, inserting otherwise.
    ///
    /// # Errors
    ///
    /// Store faults are returned as-is.
    pub async fn reconcile(
        &self,
        business_key: &str,
        result: &GeneratedResult,
        existing: Option<&ExistingRecord>,
        written_on: NaiveDate,
    ) -> Result<WriteOutcome, PersistenceError> {
        match existing {
            Some(record) => {
                let fields = result.to_update_fields(written_on);
                let count = self
                    .store
                    .update_fields(business_key, record.id, &fields)
                    .await?;

                if count.matched == 0 {
                    warn!(
                        business = %business_key,
                        document_id = record.id,
                        "Update matched no document, nothing written"
                    );
                } else {
                    info!(
                        business = %business_key,
                        document_id = record.id,
                        modified = count.modified,
                        "Updated existing document"
                    );
                }

                Ok(WriteOutcome {
                    mode: WriteMode::Updated,
                    document_id: record.id,
                    modified: count.modified > 0,
                })
            }
            None => {
                let document = result.to_document(written_on);
                let id = self.store.insert(business_key, &document).await?;
                info!(business = %business_key, document_id = id, "Inserted new document");

                Ok(WriteOutcome {
                    mode: WriteMode::Inserted,
                    document_id: id,
                    modified: true,
                })
            }
        }
    }
}
