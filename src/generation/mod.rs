//! Generation service integration.
//!
//! - [`client`]: the single-shot HTTP client and the [`GenerationService`]
//!   trait the processor depends on
//! - [`retry`]: the fixed one-retry budget wrapped around a service
//! - [`types`]: request shape and the validated [`GeneratedResult`]
//!
//! ```ignore
//! use adforge::generation::{call_with_retry, GenerationRequest, HttpGenerationClient};
//! use std::time::Duration;
//!
//! let client = HttpGenerationClient::new("http://localhost:8000/run", Duration::from_secs(120))?;
//! let request = GenerationRequest::new("Acme Bikes").with_persona("commuters, racers");
//! let generated = call_with_retry(&client, &request).await?;
//! println!("took {} attempt(s)", generated.attempts);
//! ```

pub mod client;
pub mod retry;
pub mod types;

pub use client::{GenerationService, HttpGenerationClient};
pub use retry::{call_with_retry, Generated, MAX_RETRIES};
pub use types::{DateWritten, GeneratedResult, GenerationRequest};
