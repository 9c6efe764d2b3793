//! Error types for the mention bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Failed to open filtered stream: {0}")]
    StreamOpen(String),

    #[error("Stream closed by remote")]
    StreamClosed,

    #[error("Failed to read media asset {path}: {source}")]
    AssetRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Media upload failed: {0}")]
    Upload(String),

    #[error("Failed to submit reply: {0}")]
    ReplySubmit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors raised while handling a single mention. The dispatch loop may
    /// skip the event and keep consuming the stream; every other variant
    /// ends the process.
    pub fn is_per_event(&self) -> bool {
        matches!(
            self,
            Error::AssetRead { .. } | Error::Upload(_) | Error::ReplySubmit(_)
        )
    }

    /// Message logged before the error is reported, per failing step.
    pub fn context(&self) -> &'static str {
        match self {
            Error::Authentication(_) => "Error getting twitter client",
            Error::StreamOpen(_) | Error::StreamClosed => "Error starting stream",
            Error::AssetRead { .. } | Error::Upload(_) => "Error uploading media",
            Error::ReplySubmit(_) => "Error replying tweet",
            Error::Config(_) | Error::InvalidArgument(_) => "Error loading configuration",
            Error::SerializationError(_) | Error::Unknown(_) => "Unexpected error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Unknown(format!("Task failed: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_authentication() {
        let err = Error::Authentication("401 Unauthorized".to_string());
        assert!(err.to_string().contains("Authentication failed"));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_error_display_asset_read() {
        let err = Error::AssetRead {
            path: "meteuessa.jpg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("meteuessa.jpg"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_asset_read_has_source() {
        use std::error::Error as StdError;

        let err = Error::AssetRead {
            path: "a.jpg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn test_per_event_classification() {
        assert!(Error::Upload("boom".into()).is_per_event());
        assert!(Error::ReplySubmit("boom".into()).is_per_event());
        assert!(Error::AssetRead {
            path: "x".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "x"),
        }
        .is_per_event());

        assert!(!Error::Authentication("x".into()).is_per_event());
        assert!(!Error::StreamOpen("x".into()).is_per_event());
        assert!(!Error::StreamClosed.is_per_event());
        assert!(!Error::Config("x".into()).is_per_event());
    }

    #[test]
    fn test_context_messages() {
        assert_eq!(
            Error::Authentication("x".into()).context(),
            "Error getting twitter client"
        );
        assert_eq!(Error::StreamOpen("x".into()).context(), "Error starting stream");
        assert_eq!(Error::Upload("x".into()).context(), "Error uploading media");
        assert_eq!(Error::ReplySubmit("x".into()).context(), "Error replying tweet");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_from_serde_yaml() {
        let yaml_err = serde_yaml::from_str::<Vec<i32>>("{not: [a list").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_is_fatal() {
        let err = Error::Unknown("worker panicked".into());
        assert!(!err.is_per_event());
        assert_eq!(err.context(), "Unexpected error");
        assert!(err.to_string().contains("worker panicked"));
    }

    #[test]
    fn test_error_debug_impl() {
        let err = Error::StreamClosed;
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("StreamClosed"));
    }
}
