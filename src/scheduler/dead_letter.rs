//! Dead-letter routing.

use async_trait::async_trait;

use crate::error::RouterError;

/// Re-publishes failed job bodies to a dead-letter destination.
///
/// Implementations must publish `body` exactly as given.
#[async_trait]
pub trait DeadLetterRouter: Send + Sync {
    /// Name of the destination, for logs.
    fn destination(&self) -> &str;

    async fn route(&self, body: &str) -> Result<(), RouterError>;
}
