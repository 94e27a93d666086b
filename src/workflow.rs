//! Downstream workflow starts.
//!
//! Starting a workflow is fire-and-forget: the trigger records an execution
//! request and returns its id; nobody waits for the workflow to finish.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::WorkflowError;

/// Trait for workflow engines.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Starts one execution for `business_name` and returns its id.
    ///
    /// The execution input is `business_name` merged with `extra`.
    async fn start(
        &self,
        business_name: &str,
        extra: Map<String, Value>,
    ) -> Result<String, WorkflowError>;
}

/// An execution request as recorded for the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub execution_id: String,
    pub workflow_id: String,
    pub input: Value,
    pub started_at: String,
}

impl ExecutionRequest {
    /// Builds a request with a fresh execution id.
    pub fn new(workflow_id: &str, business_name: &str, extra: Map<String, Value>) -> Self {
        let mut input = Map::new();
        input.insert(
            "business_name".to_string(),
            Value::String(business_name.to_string()),
        );
        input.extend(extra);

        Self {
            execution_id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            input: Value::Object(input),
            started_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Starts workflows by pushing execution requests onto a Redis list that the
/// workflow runner consumes: `workflow:{workflow_id}:executions`.
pub struct RedisWorkflowTrigger {
    redis: ConnectionManager,
    workflow_id: String,
    executions_key: String,
}

impl RedisWorkflowTrigger {
    pub fn new(redis: ConnectionManager, workflow_id: &str) -> Self {
        Self {
            redis,
            workflow_id: workflow_id.to_string(),
            executions_key: executions_key(workflow_id),
        }
    }

    /// Connects to Redis and creates a trigger for `workflow_id`.
    pub async fn connect(redis_url: &str, workflow_id: &str) -> Result<Self, WorkflowError> {
        let start_failed = |reason: String| WorkflowError::StartFailed {
            workflow_id: workflow_id.to_string(),
            reason,
        };

        let client = redis::Client::open(redis_url).map_err(|e| start_failed(e.to_string()))?;
        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| start_failed(e.to_string()))?;

        Ok(Self::new(redis, workflow_id))
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }
}

fn executions_key(workflow_id: &str) -> String {
    format!("workflow:{}:executions", workflow_id)
}

#[async_trait]
impl WorkflowTrigger for RedisWorkflowTrigger {
    async fn start(
        &self,
        business_name: &str,
        extra: Map<String, Value>,
    ) -> Result<String, WorkflowError> {
        let request = ExecutionRequest::new(&self.workflow_id, business_name, extra);
        let serialized = serde_json::to_string(&request)?;

        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.executions_key, serialized)
            .await
            .map_err(|e| WorkflowError::StartFailed {
                workflow_id: self.workflow_id.clone(),
                reason: e.to_string(),
            })?;

        Ok(request.execution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_input_merges_extra_fields() {
        let mut extra = Map::new();
        extra.insert("email".to_string(), json!("owner@acme.test"));

        let request = ExecutionRequest::new("ad-refresh", "Acme", extra);
        assert_eq!(
            request.input,
            json!({"business_name": "Acme", "email": "owner@acme.test"})
        );
        assert_eq!(request.workflow_id, "ad-refresh");
        assert!(Uuid::parse_str(&request.execution_id).is_ok());
    }

    #[test]
    fn test_execution_ids_are_unique() {
        let a = ExecutionRequest::new("wf", "Acme", Map::new());
        let b = ExecutionRequest::new("wf", "Acme", Map::new());
        assert_ne!(a.execution_id, b.execution_id);
        assert_eq!(a.input, json!({"business_name": "Acme"}));
    }

    #[test]
    fn test_executions_key() {
        assert_eq!(executions_key("ad-refresh"), "workflow:ad-refresh:executions");
    }
}
