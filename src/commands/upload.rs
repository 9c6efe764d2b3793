//! One-off upload of the reply image, useful to check the asset and the
//! upload permissions before running the bot.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::media::upload_asset;
use crate::twitter::{authenticate, MediaUpload};

/// Upload `asset`, or the configured asset when `None`.
pub async fn run(config: &Config, asset: Option<&Path>) -> Result<MediaUpload> {
    let client = authenticate(&config.credentials, config.endpoints.clone()).await?;
    let path = asset.unwrap_or(config.asset_path.as_path());

    upload_asset(&client, path, &config.media_category).await
}
