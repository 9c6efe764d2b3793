//! Twitter API client.
//!
//! Provides:
//! - OAuth 1.0a request signing
//! - Credential verification, chunked media upload, status updates
//! - The filtered real-time stream

pub mod client;
pub mod models;
pub mod oauth;
pub mod stream;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{authenticate, TwitterClient};
pub use models::{
    MediaUpload, StallWarning, StatusUpdateParams, StreamFilterParams, StreamMessage, Tweet, User,
    VerifyParams,
};
pub use oauth::OAuthSigner;
pub use stream::FilterStream;

/// Remote calls made while replying to a mention.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Upload a binary asset and return its media id.
    async fn upload_media(
        &self,
        data: Vec<u8>,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaUpload>;

    /// Post a status; used for replies.
    async fn update_status(&self, status: &str, params: &StatusUpdateParams) -> Result<Tweet>;
}
