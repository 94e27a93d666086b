//! SQLite-backed document store and webhook directory.
//!
//! Every operation opens its own connection and closes it afterwards, so no
//! idle connection is held while a job waits on the generation service.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Connection, Row};

use super::document::{DocumentStore, StoredDocument, UpdateCount, WebhookDirectory};
use crate::error::PersistenceError;

const SCHEMA_SQL: [&str; 3] = [
    r#"
CREATE TABLE IF NOT EXISTS documents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    collection  TEXT    NOT NULL,
    body        TEXT    NOT NULL,
    created_at  TEXT    NOT NULL DEFAULT (datetime('now'))
)"#,
    "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, id)",
    r#"
CREATE TABLE IF NOT EXISTS webhooks (
    business_key TEXT PRIMARY KEY,
    webhook_url  TEXT NOT NULL
)"#,
];

/// Document store kept in a single SQLite database file.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    options: SqliteConnectOptions,
}

impl SqliteDocumentStore {
    /// Prepares a store for `database_url` (`sqlite://path/to/file.db`).
    ///
    /// Nothing is opened until the first operation.
    pub fn new(database_url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::Connection(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        Ok(Self { options })
    }

    /// Creates the tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), PersistenceError> {
        let mut conn = self.connect().await?;
        let mut result = Ok(());
        for statement in SCHEMA_SQL {
            if let Err(e) = sqlx::query(statement).execute(&mut conn).await {
                result = Err(e.into());
                break;
            }
        }
        close(conn).await;

        if result.is_ok() {
            tracing::info!("Document store schema ready");
        }
        result
    }

    /// Sets the webhook for a business, replacing any previous mapping.
    pub async fn map_webhook(
        &self,
        business_key: &str,
        webhook_url: &str,
    ) -> Result<(), PersistenceError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(
            "INSERT INTO webhooks (business_key, webhook_url) VALUES (?1, ?2) \
             ON CONFLICT(business_key) DO UPDATE SET webhook_url = excluded.webhook_url",
        )
        .bind(business_key)
        .bind(webhook_url)
        .execute(&mut conn)
        .await;
        close(conn).await;

        result?;
        Ok(())
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> Result<u64, PersistenceError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&mut conn)
            .await;
        close(conn).await;

        let n: i64 = result?.try_get("n")?;
        Ok(n as u64)
    }

    async fn connect(&self) -> Result<SqliteConnection, PersistenceError> {
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))
    }
}

async fn close(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "Closing document store connection failed");
    }
}

fn parse_body(id: i64, raw: &str) -> Result<Map<String, Value>, PersistenceError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(body) => Ok(body),
        _ => Err(PersistenceError::CorruptDocument { id }),
    }
}

async fn update_in(
    conn: &mut SqliteConnection,
    collection: &str,
    id: i64,
    fields: &Map<String, Value>,
) -> Result<UpdateCount, PersistenceError> {
    let mut tx = conn.begin().await?;

    let row = sqlx::query("SELECT body FROM documents WHERE id = ?1 AND collection = ?2")
        .bind(id)
        .bind(collection)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = row else {
        tx.commit().await?;
        return Ok(UpdateCount::default());
    };

    let raw: String = row.try_get("body")?;
    let mut body = parse_body(id, &raw)?;

    let mut changed = false;
    for (key, value) in fields {
        if body.get(key) != Some(value) {
            body.insert(key.clone(), value.clone());
            changed = true;
        }
    }

    if changed {
        sqlx::query("UPDATE documents SET body = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(&body)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(UpdateCount {
        matched: 1,
        modified: u64::from(changed),
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn latest(&self, collection: &str) -> Result<Option<StoredDocument>, PersistenceError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id DESC LIMIT 1",
        )
        .bind(collection)
        .fetch_optional(&mut conn)
        .await;
        close(conn).await;

        let Some(row) = result? else {
            return Ok(None);
        };
        let id: i64 = row.try_get("id")?;
        let raw: String = row.try_get("body")?;

        Ok(Some(StoredDocument {
            id,
            body: parse_body(id, &raw)?,
        }))
    }

    async fn insert(
        &self,
        collection: &str,
        body: &Map<String, Value>,
    ) -> Result<i64, PersistenceError> {
        let encoded = serde_json::to_string(body)?;
        let mut conn = self.connect().await?;
        let result = sqlx::query("INSERT INTO documents (collection, body) VALUES (?1, ?2)")
            .bind(collection)
            .bind(encoded)
            .execute(&mut conn)
            .await;
        close(conn).await;

        Ok(result?.last_insert_rowid())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: i64,
        fields: &Map<String, Value>,
    ) -> Result<UpdateCount, PersistenceError> {
        let mut conn = self.connect().await?;
        let result = update_in(&mut conn, collection, id, fields).await;
        close(conn).await;
        result
    }
}

#[async_trait]
impl WebhookDirectory for SqliteDocumentStore {
    async fn webhook_for(&self, business_key: &str) -> Result<Option<String>, PersistenceError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("SELECT webhook_url FROM webhooks WHERE business_key = ?1")
            .bind(business_key)
            .fetch_optional(&mut conn)
            .await;
        close(conn).await;

        match result? {
            Some(row) => Ok(Some(row.try_get("webhook_url")?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn fresh_store() -> (TempDir, SqliteDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("docs.db").display());
        let store = SqliteDocumentStore::new(&url).unwrap();
        store.init_schema().await.unwrap();
        (dir, store)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_latest_returns_most_recent_insert() {
        let (_dir, store) = fresh_store().await;
        assert!(store.latest("Acme").await.unwrap().is_none());

        store.insert("Acme", &object(json!({"n": 1}))).await.unwrap();
        let second = store.insert("Acme", &object(json!({"n": 2}))).await.unwrap();
        store.insert("Other", &object(json!({"n": 3}))).await.unwrap();

        let latest = store.latest("Acme").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.body["n"], 2);
        assert_eq!(store.count("Acme").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_fields_preserves_other_fields() {
        let (_dir, store) = fresh_store().await;
        let id = store
            .insert("Acme", &object(json!({"keep": "me", "list_of_keywords": ["old"]})))
            .await
            .unwrap();

        let count = store
            .update_fields("Acme", id, &object(json!({"list_of_keywords": ["new"]})))
            .await
            .unwrap();
        assert_eq!(count, UpdateCount { matched: 1, modified: 1 });

        let doc = store.latest("Acme").await.unwrap().unwrap();
        assert_eq!(doc.body["keep"], "me");
        assert_eq!(doc.body["list_of_keywords"], json!(["new"]));
    }

    #[tokio::test]
    async fn test_update_without_changes_or_match() {
        let (_dir, store) = fresh_store().await;
        let id = store.insert("Acme", &object(json!({"a": 1}))).await.unwrap();

        let unchanged = store
            .update_fields("Acme", id, &object(json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(unchanged, UpdateCount { matched: 1, modified: 0 });

        let missing = store
            .update_fields("Other", id, &object(json!({"a": 2})))
            .await
            .unwrap();
        assert_eq!(missing, UpdateCount::default());
    }

    #[tokio::test]
    async fn test_webhook_mapping_upserts() {
        let (_dir, store) = fresh_store().await;
        assert!(store.webhook_for("Acme").await.unwrap().is_none());

        store.map_webhook("Acme", "http://one").await.unwrap();
        store.map_webhook("Acme", "http://two").await.unwrap();
        assert_eq!(
            store.webhook_for("Acme").await.unwrap().as_deref(),
            Some("http://two")
        );
    }

    #[tokio::test]
    async fn test_unreachable_database_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}",
            dir.path().join("missing-dir").join("docs.db").display()
        );
        let store = SqliteDocumentStore::new(&url).unwrap();

        let err = store.latest("Acme").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Connection(_)));
    }
}
