//! Twitter API v1.1 payloads used by the bot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Account that authored a tweet, or the authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub id_str: String,
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A status (tweet). Fields the bot does not use are kept in `extra` so
/// log dumps show the full payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: i64,
    #[serde(default)]
    pub id_str: String,
    #[serde(default)]
    pub text: String,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_status_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Tweet {
    pub fn author(&self) -> &str {
        &self.user.screen_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image_type: String,
    pub w: u32,
    pub h: u32,
}

/// Response of `media/upload.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaUpload {
    pub media_id: i64,
    #[serde(default)]
    pub media_id_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_after_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInfo>,
}

/// Query parameters for `account/verify_credentials.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyParams {
    pub include_email: bool,
    pub skip_status: bool,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            include_email: true,
            skip_status: true,
        }
    }
}

impl VerifyParams {
    pub fn query(&self) -> Vec<(String, String)> {
        vec![
            ("include_email".to_string(), self.include_email.to_string()),
            ("skip_status".to_string(), self.skip_status.to_string()),
        ]
    }
}

/// Optional parameters of `statuses/update.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdateParams {
    pub in_reply_to_status_id: Option<i64>,
    pub media_ids: Vec<i64>,
}

impl StatusUpdateParams {
    /// Form body for a status update with the given text.
    pub fn form(&self, status: &str) -> Vec<(String, String)> {
        let mut form = vec![("status".to_string(), status.to_string())];
        if let Some(id) = self.in_reply_to_status_id {
            form.push(("in_reply_to_status_id".to_string(), id.to_string()));
        }
        if !self.media_ids.is_empty() {
            let ids = self
                .media_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            form.push(("media_ids".to_string(), ids));
        }
        form
    }
}

/// Parameters of `statuses/filter.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFilterParams {
    pub track: Vec<String>,
    pub stall_warnings: bool,
}

impl StreamFilterParams {
    pub fn form(&self) -> Vec<(String, String)> {
        let mut form = Vec::new();
        if !self.track.is_empty() {
            form.push(("track".to_string(), self.track.join(",")));
        }
        if self.stall_warnings {
            form.push(("stall_warnings".to_string(), "true".to_string()));
        }
        form
    }
}

/// Emitted when the client is falling behind the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallWarning {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub percent_full: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disconnect {
    pub code: i32,
    #[serde(default)]
    pub stream_name: Option<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDeletion {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// One decoded message from the filtered stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Tweet(Box<Tweet>),
    StallWarning(StallWarning),
    Disconnect(Disconnect),
    /// Number of undelivered tweets matching the filter.
    Limit { track: u64 },
    StatusDeletion(StatusDeletion),
    Other(Value),
}

impl StreamMessage {
    /// Classify one stream line by its top-level keys.
    pub fn decode(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;

        let Some(obj) = value.as_object() else {
            return Ok(StreamMessage::Other(value));
        };

        if let Some(warning) = obj.get("warning") {
            return Ok(StreamMessage::StallWarning(serde_json::from_value(
                warning.clone(),
            )?));
        }
        if let Some(disconnect) = obj.get("disconnect") {
            return Ok(StreamMessage::Disconnect(serde_json::from_value(
                disconnect.clone(),
            )?));
        }
        if let Some(limit) = obj.get("limit") {
            let track = limit.get("track").and_then(Value::as_u64).unwrap_or(0);
            return Ok(StreamMessage::Limit { track });
        }
        if let Some(status) = obj.get("delete").and_then(|d| d.get("status")) {
            return Ok(StreamMessage::StatusDeletion(serde_json::from_value(
                status.clone(),
            )?));
        }
        if obj.contains_key("text") && obj.contains_key("user") {
            return Ok(StreamMessage::Tweet(Box::new(serde_json::from_value(value)?)));
        }

        Ok(StreamMessage::Other(value))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Tweet(_) => "tweet",
            StreamMessage::StallWarning(_) => "stall_warning",
            StreamMessage::Disconnect(_) => "disconnect",
            StreamMessage::Limit { .. } => "limit",
            StreamMessage::StatusDeletion(_) => "delete",
            StreamMessage::Other(_) => "other",
        }
    }
}
