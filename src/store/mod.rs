//! Document persistence.
//!
//! - [`document`]: store traits and the record types read back from a store
//! - [`reconciler`]: the insert-versus-update write for a generated result
//! - [`sqlite`]: the SQLite implementation, also serving the webhook mapping

pub mod document;
pub mod reconciler;
pub mod sqlite;

pub use document::{DocumentStore, ExistingRecord, StoredDocument, UpdateCount, WebhookDirectory};
pub use reconciler::{Reconciler, WriteMode, WriteOutcome};
pub use sqlite::SqliteDocumentStore;
