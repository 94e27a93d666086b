//! Stakeholder notifications.
//!
//! A notification is best effort: the processor logs a failed notify and
//! carries on with the job. Two transports exist:
//!
//! - [`DiscordNotifier`]: posts to a chat webhook, splitting long messages
//! - [`SesNotifier`]: sends a plain-text email through SES

pub mod chunking;
pub mod discord;
pub mod ses;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::generation::GeneratedResult;

pub use chunking::{chunk_message, DISCORD_MESSAGE_LIMIT};
pub use discord::DiscordNotifier;
pub use ses::SesNotifier;

/// Subject of the research-complete notification.
pub const COMPLETION_SUBJECT: &str = "AdAlchemyAI: Initial Research Completed";

/// Body of the research-complete notification for `business_name`.
pub fn completion_body(business_name: &str) -> String {
    format!(
        "The initial research carried out by the Initial Market Researcher AI Agent for {} is complete. \
         Please review the research using the /paths and /business slash commands in your Discord bot.",
        business_name
    )
}

/// Subject of the ad-copy refresh notification.
pub const REFRESH_SUBJECT: &str = "AdAlchemyAI: Ad Copy Refreshed";

/// Body of the refresh notification, listing the new keywords and ad text.
pub fn refresh_body(business_name: &str, result: &GeneratedResult) -> String {
    let mut body = format!("New ad copy is ready for {}.\n\nKeywords:\n", business_name);
    for keyword in &result.list_of_keywords {
        body.push_str(&format!("- {}\n", keyword));
    }
    body.push_str("\nAd text:\n");
    for ad in &result.list_of_ad_text {
        body.push_str(&format!("- {}\n", ad));
    }
    body
}

/// Trait for notification transports.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message to `recipient`.
    ///
    /// `recipient` is whatever the transport addresses: a webhook URL or an
    /// email address.
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}
