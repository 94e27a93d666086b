//! Where batches of raw queue messages come from.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use super::queue::QueueError;

/// Trait for inbound message sources.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Takes up to `max` raw message bodies off the source.
    ///
    /// An empty batch means the source is drained for now.
    async fn receive_batch(&self, max: usize) -> Result<Vec<String>, QueueError>;
}

#[derive(Deserialize)]
struct QueueEvent {
    #[serde(rename = "Records")]
    records: Vec<QueueRecord>,
}

#[derive(Deserialize)]
struct QueueRecord {
    body: String,
}

/// Messages delivered as a queue-trigger event file:
/// `{"Records": [{"body": "..."}, ...]}`.
pub struct EventFileSource {
    pending: Mutex<VecDeque<String>>,
}

impl EventFileSource {
    /// Parses an event document.
    pub fn from_json(event: &str) -> Result<Self, QueueError> {
        let event: QueueEvent =
            serde_json::from_str(event).map_err(|e| QueueError::EventFile(e.to_string()))?;

        Ok(Self {
            pending: Mutex::new(event.records.into_iter().map(|r| r.body).collect()),
        })
    }

    /// Reads and parses an event file.
    pub async fn open(path: &Path) -> Result<Self, QueueError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| QueueError::EventFile(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Number of messages not yet handed out.
    pub fn remaining(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl JobSource for EventFileSource {
    async fn receive_batch(&self, max: usize) -> Result<Vec<String>, QueueError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|e| QueueError::EventFile(e.to_string()))?;
        let take = max.min(pending.len());
        Ok(pending.drain(..take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EVENT: &str = r#"{"Records": [
        {"body": "{\"business_name\": \"A\"}", "messageId": "1"},
        {"body": "{\"business_name\": \"B\"}"},
        {"body": "not json at all"}
    ]}"#;

    #[tokio::test]
    async fn test_batches_are_drained_in_order() {
        let source = EventFileSource::from_json(EVENT).unwrap();

        let first = source.receive_batch(2).await.unwrap();
        assert_eq!(first, vec![r#"{"business_name": "A"}"#, r#"{"business_name": "B"}"#]);

        let second = source.receive_batch(2).await.unwrap();
        assert_eq!(second, vec!["not json at all"]);

        assert!(source.receive_batch(2).await.unwrap().is_empty());
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EVENT.as_bytes()).unwrap();

        let source = EventFileSource::open(file.path()).await.unwrap();
        assert_eq!(source.remaining(), 3);
    }

    #[test]
    fn test_malformed_event_is_rejected() {
        assert!(matches!(
            EventFileSource::from_json(r#"{"records": []}"#),
            Err(QueueError::EventFile(_))
        ));
    }
}
