//! Retry controller for generation calls.
//!
//! The budget is fixed at one retry: a transient failure of the generation
//! service is absorbed, a systemic outage is not. Retries are immediate, with
//! no backoff and no jitter.

use serde_json::Value;
use tracing::{error, warn};

use super::client::GenerationService;
use super::types::GenerationRequest;
use crate::error::ExhaustedRetries;

/// Number of retries after the first attempt.
pub const MAX_RETRIES: u32 = 1;

/// A successful generation together with the attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub body: Value,
    pub attempts: u32,
}

/// Calls `service` with the fixed retry budget.
///
/// Each failed attempt is logged with its number. When the last attempt
/// fails its error is returned unchanged inside [`ExhaustedRetries`].
pub async fn call_with_retry(
    service: &dyn GenerationService,
    request: &GenerationRequest,
) -> Result<Generated, ExhaustedRetries> {
    let max_attempts = MAX_RETRIES + 1;
    let mut attempt = 1;

    loop {
        match service.call(request).await {
            Ok(body) => {
                return Ok(Generated {
                    body,
                    attempts: attempt,
                })
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    business = %request.business_name,
                    attempt = attempt,
                    error = %e,
                    "Generation attempt failed, retrying"
                );
                attempt += 1;
            }
            Err(e) => {
                error!(
                    business = %request.business_name,
                    attempt = attempt,
                    error = %e,
                    "Generation attempt failed, retry budget exhausted"
                );
                return Err(ExhaustedRetries {
                    attempts: attempt,
                    last_error: e,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalCallError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock service that replays scripted outcomes, then succeeds.
    struct ScriptedService {
        failures: Mutex<Vec<ExternalCallError>>,
        call_count: AtomicUsize,
    }

    impl ScriptedService {
        fn failing(failures: Vec<ExternalCallError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                call_count: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        async fn call(&self, _request: &GenerationRequest) -> Result<Value, ExternalCallError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.failures.lock().expect("lock not poisoned");
            if failures.is_empty() {
                Ok(json!({"list_of_keywords": ["ok"], "list_of_ad_text": []}))
            } else {
                Err(failures.remove(0))
            }
        }
    }

    fn status(code: u16) -> ExternalCallError {
        ExternalCallError::Status {
            status: code,
            body: format!("status {}", code),
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let service = ScriptedService::failing(vec![]);
        let generated = call_with_retry(&service, &GenerationRequest::new("Acme"))
            .await
            .unwrap();

        assert_eq!(generated.attempts, 1);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_once_then_success() {
        let service = ScriptedService::failing(vec![status(502)]);
        let generated = call_with_retry(&service, &GenerationRequest::new("Acme"))
            .await
            .unwrap();

        assert_eq!(generated.attempts, 2);
        assert_eq!(service.calls(), 2);
        assert_eq!(generated.body["list_of_keywords"], json!(["ok"]));
    }

    #[tokio::test]
    async fn test_two_failures_exhaust_budget() {
        let service = ScriptedService::failing(vec![
            status(500),
            ExternalCallError::Transport("connection reset".to_string()),
            status(500),
        ]);
        let err = call_with_retry(&service, &GenerationRequest::new("Acme"))
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 2);
        assert_eq!(service.calls(), 2);
        match err.last_error {
            ExternalCallError::Transport(reason) => assert_eq!(reason, "connection reset"),
            other => panic!("unexpected last error: {other}"),
        }
    }
}
