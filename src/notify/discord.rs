//! Chat webhook notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::chunking::{chunk_message, DISCORD_MESSAGE_LIMIT};
use super::Notifier;
use crate::error::NotifyError;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts notifications to a Discord-compatible webhook.
///
/// Long messages go out as sequential `(Part i/N)` posts. A rejected part
/// fails the notification; parts already posted stay posted.
pub struct DiscordNotifier {
    http_client: Client,
    limit: usize,
}

impl DiscordNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            limit: DISCORD_MESSAGE_LIMIT,
        })
    }

    /// Overrides the per-part character limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = if subject.is_empty() {
            body.to_string()
        } else {
            format!("**{}**\n{}", subject, body)
        };

        let parts = chunk_message(&message, self.limit)?;
        let total = parts.len();

        for (i, part) in parts.iter().enumerate() {
            let response = self
                .http_client
                .post(recipient)
                .json(&WebhookPayload { content: part })
                .send()
                .await
                .map_err(|e| NotifyError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NotifyError::PartRejected {
                    part: i + 1,
                    total,
                    status: status.as_u16(),
                    body,
                });
            }

            tracing::debug!(part = i + 1, total = total, "Posted notification part");
        }

        Ok(())
    }
}
