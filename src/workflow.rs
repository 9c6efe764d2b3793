//! Reply workflow for a single mention.
//!
//! Stages per event:
//! `Received → MediaUploading → MediaUploaded → ReplyComposing →
//! ReplySubmitted → Logged`, or `Failed` at the upload or submit step.
//! No state is carried between events except the optional media cache.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::logging::log_json;
use crate::media::{upload_asset, MediaCache};
use crate::metrics;
use crate::twitter::{MediaUpload, StatusUpdateParams, Tweet, TwitterApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStage {
    Received,
    MediaUploading,
    MediaUploaded,
    ReplyComposing,
    ReplySubmitted,
    Logged,
    Failed,
}

impl ReplyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyStage::Received => "received",
            ReplyStage::MediaUploading => "media_uploading",
            ReplyStage::MediaUploaded => "media_uploaded",
            ReplyStage::ReplyComposing => "reply_composing",
            ReplyStage::ReplySubmitted => "reply_submitted",
            ReplyStage::Logged => "logged",
            ReplyStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ReplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status text and parameters of the reply to `tweet`.
///
/// The text is `@` followed by the author's screen name, verbatim.
pub fn compose_reply(tweet: &Tweet, media: &MediaUpload) -> (String, StatusUpdateParams) {
    let status = format!("@{}", tweet.user.screen_name);
    let params = StatusUpdateParams {
        in_reply_to_status_id: Some(tweet.id),
        media_ids: vec![media.media_id],
    };
    (status, params)
}

/// Replies to mentions with the configured image.
pub struct ReplyWorkflow<A: ?Sized> {
    api: Arc<A>,
    asset_path: PathBuf,
    media_category: String,
    cache: Option<MediaCache>,
}

impl<A: TwitterApi + ?Sized> ReplyWorkflow<A> {
    /// Workflow that uploads the asset for every reply.
    pub fn new(
        api: Arc<A>,
        asset_path: impl Into<PathBuf>,
        media_category: impl Into<String>,
    ) -> Self {
        Self {
            api,
            asset_path: asset_path.into(),
            media_category: media_category.into(),
            cache: None,
        }
    }

    pub fn from_config(api: Arc<A>, config: &Config) -> Self {
        let workflow = Self::new(api, config.asset_path.clone(), config.media_category.clone());
        if config.cache_media {
            workflow.with_media_cache()
        } else {
            workflow
        }
    }

    /// Reuse an upload across replies until it is about to expire.
    pub fn with_media_cache(mut self) -> Self {
        self.cache = Some(MediaCache::new());
        self
    }

    /// Run the full workflow for one inbound tweet and return the reply.
    pub async fn handle(&mut self, tweet: &Tweet) -> Result<Tweet> {
        let started = Instant::now();
        let result = self.reply_to(tweet).await;

        if result.is_err() {
            trace_stage(tweet, ReplyStage::Failed);
        }
        metrics::record_reply(started.elapsed(), result.is_ok());
        result
    }

    async fn reply_to(&mut self, tweet: &Tweet) -> Result<Tweet> {
        trace_stage(tweet, ReplyStage::Received);
        log_json("Tweet to reply:", tweet);

        trace_stage(tweet, ReplyStage::MediaUploading);
        let media = self.media().await?;
        trace_stage(tweet, ReplyStage::MediaUploaded);

        trace_stage(tweet, ReplyStage::ReplyComposing);
        let (status, params) = compose_reply(tweet, &media);

        let reply = match self.api.update_status(&status, &params).await {
            Ok(reply) => reply,
            Err(err) => {
                // the platform may have dropped the media; upload afresh next time
                if let Some(cache) = self.cache.as_mut() {
                    cache.invalidate();
                }
                return Err(err);
            }
        };
        trace_stage(tweet, ReplyStage::ReplySubmitted);

        log_json("Tweet replied:", &reply);
        info!(
            tweet_id = tweet.id,
            reply_id = reply.id,
            author = %tweet.user.screen_name,
            "Replied to mention"
        );
        trace_stage(tweet, ReplyStage::Logged);

        Ok(reply)
    }

    async fn media(&mut self) -> Result<MediaUpload> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(Instant::now())) {
            debug!(media_id = cached.media_id, "Reusing cached media upload");
            return Ok(cached.clone());
        }

        let upload = upload_asset(self.api.as_ref(), &self.asset_path, &self.media_category).await?;
        if let Some(cache) = self.cache.as_mut() {
            cache.store(upload.clone(), Instant::now());
        }
        Ok(upload)
    }
}

fn trace_stage(tweet: &Tweet, stage: ReplyStage) {
    debug!(tweet_id = tweet.id, %stage, "Reply workflow stage");
}
