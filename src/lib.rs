//! Twitter Mention Auto-replier Library
//!
//! This library provides tools to:
//! - Authenticate against the Twitter API with OAuth 1.0a user credentials
//! - Subscribe to the filtered real-time stream for mentions of the bot
//! - Upload the reply image with the chunked media endpoint
//! - Reply to every mention, one event at a time
//! - Expose Prometheus metrics for the running bot

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod twitter;
pub mod workflow;

// Re-export common types
pub use config::{Config, Credentials, Endpoints};
pub use dispatch::{run_dispatch, DispatchSummary, EventErrorPolicy};
pub use error::{Error, Result};
pub use media::MediaCache;
pub use twitter::{authenticate, FilterStream, StreamMessage, Tweet, TwitterApi, TwitterClient};
pub use workflow::{compose_reply, ReplyWorkflow};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
