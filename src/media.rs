//! Reply image: reading the local asset, uploading it, and remembering the
//! upload while the platform still holds it.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};
use crate::logging::log_json;
use crate::metrics;
use crate::twitter::{MediaUpload, TwitterApi};

/// Lifetime assumed when the upload response carries no expiry.
pub const DEFAULT_MEDIA_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Cached uploads are dropped this long before the platform expires them.
pub const MEDIA_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// MIME type for the upload INIT call, guessed from the file extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Read the whole asset into memory.
pub async fn read_asset(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| Error::AssetRead {
        path: path.display().to_string(),
        source,
    })
}

/// Read the asset from disk and upload it. Every call is a fresh upload.
pub async fn upload_asset<A>(api: &A, path: &Path, media_category: &str) -> Result<MediaUpload>
where
    A: TwitterApi + ?Sized,
{
    let result = async {
        let content = read_asset(path).await?;
        api.upload_media(content, media_type_for(path), media_category)
            .await
    }
    .await;

    metrics::record_media_upload(result.is_ok());

    let media = result?;
    log_json("Media Uploaded:", &media);
    Ok(media)
}

#[derive(Debug, Clone)]
struct CachedMedia {
    upload: MediaUpload,
    valid_until: Instant,
}

/// Holds the last successful upload until shortly before it expires.
#[derive(Debug, Default)]
pub struct MediaCache {
    entry: Option<CachedMedia>,
}

impl MediaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached upload if it is still usable at `now`.
    pub fn get(&self, now: Instant) -> Option<&MediaUpload> {
        self.entry
            .as_ref()
            .filter(|e| now < e.valid_until)
            .map(|e| &e.upload)
    }

    pub fn store(&mut self, upload: MediaUpload, now: Instant) {
        let lifetime = upload
            .expires_after_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MEDIA_LIFETIME);
        let valid_until = now + lifetime.saturating_sub(MEDIA_EXPIRY_MARGIN);

        debug!(media_id = upload.media_id, ?lifetime, "Caching uploaded media");
        self.entry = Some(CachedMedia {
            upload,
            valid_until,
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
