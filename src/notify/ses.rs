//! Email notifier backed by Amazon SES (v2 API).

use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client;

use super::Notifier;
use crate::error::NotifyError;

/// Sends plain-text notifications from a fixed sender address.
pub struct SesNotifier {
    client: Client,
    source_email: String,
}

impl SesNotifier {
    pub fn new(client: Client, source_email: impl Into<String>) -> Self {
        Self {
            client,
            source_email: source_email.into(),
        }
    }

    /// Builds a client from the default AWS credential and region chain.
    pub async fn from_env(source_email: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(Client::new(&config), source_email)
    }

    fn build_content(subject: &str, body: &str) -> Result<EmailContent, NotifyError> {
        let subject = Content::builder()
            .data(subject)
            .build()
            .map_err(|e| NotifyError::Email(format!("Failed to build subject: {e}")))?;
        let text = Content::builder()
            .data(body)
            .build()
            .map_err(|e| NotifyError::Email(format!("Failed to build body: {e}")))?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().text(text).build())
            .build();

        Ok(EmailContent::builder().simple(message).build())
    }
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if recipient.trim().is_empty() {
            return Err(NotifyError::NoRecipient(subject.to_string()));
        }

        let content = Self::build_content(subject, body)?;
        let destination = Destination::builder().to_addresses(recipient).build();

        self.client
            .send_email()
            .from_email_address(&self.source_email)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| NotifyError::Email(format!("Failed to send email: {e}")))?;

        tracing::debug!(recipient = %recipient, "Sent notification email");
        Ok(())
    }
}
