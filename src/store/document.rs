//! Document store abstractions.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::PersistenceError;

/// A document as read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Store-assigned identifier; higher means more recently inserted.
    pub id: i64,
    pub body: Map<String, Value>,
}

/// A prior document complete enough to be updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRecord {
    pub id: i64,
    pub document: Map<String, Value>,
}

impl ExistingRecord {
    /// Fields that must be present and non-null for a record to count.
    pub const REQUIRED_FIELDS: [&'static str; 3] =
        ["user_personas", "business", "list_of_paths_taken"];

    /// Accepts `doc` only if every required field is present.
    ///
    /// Partial documents are treated as if there were no prior record.
    pub fn from_document(doc: StoredDocument) -> Option<Self> {
        let complete = Self::REQUIRED_FIELDS
            .iter()
            .all(|field| doc.body.get(*field).is_some_and(|v| !v.is_null()));

        complete.then(|| Self {
            id: doc.id,
            document: doc.body,
        })
    }

    /// The document as context for the generation service.
    pub fn context(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

/// Result of an in-place update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCount {
    pub matched: u64,
    pub modified: u64,
}

/// Collection-oriented document storage.
///
/// A collection is named by the business key it belongs to.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The most recently inserted document in `collection`, if any.
    async fn latest(&self, collection: &str) -> Result<Option<StoredDocument>, PersistenceError>;

    /// Inserts a new document and returns its id.
    async fn insert(
        &self,
        collection: &str,
        body: &Map<String, Value>,
    ) -> Result<i64, PersistenceError>;

    /// Overwrites `fields` on document `id`, leaving the other fields alone.
    async fn update_fields(
        &self,
        collection: &str,
        id: i64,
        fields: &Map<String, Value>,
    ) -> Result<UpdateCount, PersistenceError>;
}

/// Maps business keys to chat webhook URLs.
#[async_trait]
pub trait WebhookDirectory: Send + Sync {
    async fn webhook_for(&self, business_key: &str) -> Result<Option<String>, PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(body: Value) -> StoredDocument {
        let Value::Object(body) = body else {
            panic!("test document must be an object");
        };
        StoredDocument { id: 7, body }
    }

    #[test]
    fn test_complete_document_is_existing() {
        let record = ExistingRecord::from_document(doc(json!({
            "user_personas": [],
            "business": {"name": "Acme"},
            "list_of_paths_taken": ["a"],
            "list_of_keywords": ["k"],
        })))
        .unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.context()["business"]["name"], "Acme");
    }

    #[test]
    fn test_partial_document_is_absent() {
        assert!(ExistingRecord::from_document(doc(json!({
            "user_personas": [],
            "business": {"name": "Acme"},
        })))
        .is_none());

        assert!(ExistingRecord::from_document(doc(json!({
            "user_personas": [],
            "business": null,
            "list_of_paths_taken": [],
        })))
        .is_none());
    }
}
