//! Sequential dispatch of stream messages.
//!
//! A single worker pulls messages off the stream channel and runs the reply
//! workflow for each tweet to completion before receiving the next one.

use clap::ValueEnum;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::twitter::{StreamMessage, TwitterApi};
use crate::workflow::ReplyWorkflow;

/// What to do when replying to one mention fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EventErrorPolicy {
    /// Stop the bot on the first failed reply.
    #[default]
    Abort,
    /// Log the failure and keep consuming the stream.
    Skip,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub received: u64,
    pub replied: u64,
    pub failed: u64,
}

/// Consume messages until cancelled or until the channel closes.
///
/// Cancellation is checked between events only, so an in-flight reply is
/// always finished. Returns `Ok` on cancellation and
/// `Err(Error::StreamClosed)` when the stream ends on its own.
pub async fn run_dispatch<A>(
    mut messages: mpsc::Receiver<StreamMessage>,
    mut workflow: ReplyWorkflow<A>,
    policy: EventErrorPolicy,
    cancel: CancellationToken,
) -> Result<DispatchSummary>
where
    A: TwitterApi + ?Sized,
{
    let mut summary = DispatchSummary::default();

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(
                    received = summary.received,
                    replied = summary.replied,
                    failed = summary.failed,
                    "Dispatch cancelled"
                );
                return Ok(summary);
            }
            message = messages.recv() => message,
        };

        let Some(message) = message else {
            warn!("Stream channel closed");
            return Err(Error::StreamClosed);
        };

        metrics::record_stream_message(message.kind());

        match message {
            StreamMessage::Tweet(tweet) => {
                summary.received += 1;
                match workflow.handle(&tweet).await {
                    Ok(_) => summary.replied += 1,
                    Err(err) if err.is_per_event() && policy == EventErrorPolicy::Skip => {
                        summary.failed += 1;
                        error!(tweet_id = tweet.id, "{}: {}", err.context(), err);
                    }
                    Err(err) => {
                        error!(tweet_id = tweet.id, "{}: {}", err.context(), err);
                        return Err(err);
                    }
                }
            }
            StreamMessage::StallWarning(warning) => {
                warn!(
                    code = %warning.code,
                    percent_full = warning.percent_full,
                    "Stall warning: {}",
                    warning.message
                );
            }
            StreamMessage::Disconnect(disconnect) => {
                warn!(
                    code = disconnect.code,
                    stream = disconnect.stream_name.as_deref().unwrap_or("-"),
                    "Disconnect notice: {}",
                    disconnect.reason
                );
            }
            StreamMessage::Limit { track } => {
                warn!(undelivered = track, "Track limit notice");
            }
            StreamMessage::StatusDeletion(deletion) => {
                debug!(id = deletion.id, user_id = ?deletion.user_id, "Status deleted");
            }
            StreamMessage::Other(value) => {
                debug!("Ignoring stream message: {}", value);
            }
        }
    }
}
